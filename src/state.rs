use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::{Config, CredentialsProvider},
    models::answer_key::AnswerKey,
    notify::NotificationSink,
};

/// Shared, read-only handler dependencies. Nothing in here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialsProvider>,
    pub sink: Arc<dyn NotificationSink>,
    pub answer_key: Arc<AnswerKey>,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CredentialsProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.credentials.clone()
    }
}

impl FromRef<AppState> for Arc<dyn NotificationSink> {
    fn from_ref(state: &AppState) -> Self {
        state.sink.clone()
    }
}

impl FromRef<AppState> for Arc<AnswerKey> {
    fn from_ref(state: &AppState) -> Self {
        state.answer_key.clone()
    }
}
