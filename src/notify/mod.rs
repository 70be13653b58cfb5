// src/notify/mod.rs

//! Outbound notification of new submissions.
//!
//! A sink reports its outcome as a value. The handler branches on that value
//! to pick the delivery status; nothing here can fail the inbound request.

pub mod telegram;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::NotificationCredentials;

pub use telegram::TelegramSink;

/// Why a delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No response within the configured timeout.
    Timeout,
    /// The messaging API answered with a non-success status.
    Rejected { status: u16, body: String },
    /// Connection, TLS or protocol failure.
    Transport(String),
    /// The API URL could not be built for these credentials.
    InvalidEndpoint(String),
    /// The delivery task ended without reporting (panic or runtime shutdown).
    Aborted(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Timeout => write!(f, "request timed out"),
            DeliveryError::Rejected { status, body } => {
                write!(f, "API returned status {}: {}", status, body)
            }
            DeliveryError::Transport(msg) => write!(f, "transport error: {}", msg),
            DeliveryError::InvalidEndpoint(msg) => write!(f, "invalid endpoint: {}", msg),
            DeliveryError::Aborted(msg) => write!(f, "delivery aborted: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl DeliveryError {
    /// Short failure class, safe to hand back to the browser.
    pub fn category(&self) -> String {
        match self {
            DeliveryError::Timeout => "timeout".to_string(),
            DeliveryError::Rejected { status, .. } => format!("rejected ({})", status),
            DeliveryError::Transport(_) => "transport error".to_string(),
            DeliveryError::InvalidEndpoint(_) => "invalid endpoint".to_string(),
            DeliveryError::Aborted(_) => "aborted".to_string(),
        }
    }
}

/// Delivery outcome as reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    NotConfigured,
    Failed,
}

/// A destination for operator notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers `text` once. Implementations must not retry.
    async fn send(
        &self,
        credentials: &NotificationCredentials,
        text: &str,
    ) -> Result<(), DeliveryError>;
}
