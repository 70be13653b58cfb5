// src/handlers/submit.rs

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    config::NotificationCredentials,
    error::AppError,
    models::submission::{Submission, decode_body},
    notify::{DeliveryError, DeliveryStatus, NotificationSink},
    report::compose_message,
    state::AppState,
};

/// Body of every successful submission response.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: &'static str,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub telegram: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

/// Accepts a finished test and notifies the operator.
///
/// * Decodes the body (400 on empty or non-JSON input, nothing else happens).
/// * Normalizes the payload and composes the report.
/// * Reads credentials; when they are missing the submission is still accepted.
/// * Makes one delivery attempt. Its failure is logged and reported in the
///   `telegram` field only; the status stays 200.
pub async fn submit_test(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let object = decode_body(&body)?;
    let submission = Submission::from_object(&object, Utc::now());

    tracing::info!(
        student = %submission.name,
        group = %submission.group,
        score = submission.score,
        "Received submission"
    );

    let message = compose_message(
        &submission,
        &state.answer_key,
        &state.config.report_title,
    );

    let Some(credentials) = state.credentials.credentials() else {
        tracing::warn!("Telegram credentials not set, skipping notification");
        return Ok(Json(SubmitResponse {
            success: true,
            message: "Test recorded (Telegram not configured)",
            score: submission.score,
            percentage: submission.percentage,
            telegram: DeliveryStatus::NotConfigured,
            delivery_error: None,
        }));
    };

    let (telegram, delivery_error) = match deliver(state.sink.clone(), credentials, message).await {
        Ok(()) => {
            tracing::info!("Telegram message sent successfully");
            (DeliveryStatus::Sent, None)
        }
        Err(e) => {
            // Full reason (API body included) stays in the log.
            tracing::error!("Failed to send to Telegram: {}", e);
            (DeliveryStatus::Failed, Some(e.category()))
        }
    };

    Ok(Json(SubmitResponse {
        success: true,
        message: "Test submitted successfully",
        score: submission.score,
        percentage: submission.percentage,
        telegram,
        delivery_error,
    }))
}

/// Runs the delivery on its own task so a dropped client connection does not
/// cancel a request that is already on the wire.
async fn deliver(
    sink: Arc<dyn NotificationSink>,
    credentials: NotificationCredentials,
    message: String,
) -> Result<(), DeliveryError> {
    let task = tokio::spawn(async move { sink.send(&credentials, &message).await });

    match task.await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(DeliveryError::Aborted(join_err.to_string())),
    }
}

/// CORS preflight: bare 200, the header layer adds the CORS headers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback for every method other than POST and OPTIONS.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::UnsupportedMethod(method)
}
