//! Alert delivery.
//!
//! Fire-and-forget notification when an email is judged phishing. Delivery
//! failure is isolated per email by the monitor service so one broken alert
//! never aborts the rest of the batch.

mod smtp;

use async_trait::async_trait;

use crate::domain::{AiVerdict, EmailRecord, HeuristicResult};

pub use smtp::{SmtpAlertSink, SmtpConfig};

/// Result type alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

/// Errors that can occur while delivering an alert.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The alert message could not be constructed.
    #[error("invalid alert message: {0}")]
    InvalidMessage(String),

    /// SMTP transport failure.
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Trait for alert delivery backends.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Delivers a phishing alert for one email. Synchronous from the
    /// pipeline's point of view; no retry.
    async fn send_alert(
        &self,
        email: &EmailRecord,
        heuristic: &HeuristicResult,
        verdict: &AiVerdict,
    ) -> Result<()>;
}
