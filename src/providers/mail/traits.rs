//! Mail source trait definition.
//!
//! Abstracts the mailbox backend so the monitor service can be driven by an
//! in-memory source in tests. The production implementation is
//! [`super::ImapSource`].

use async_trait::async_trait;

use crate::domain::{EmailId, EmailRecord};

/// Result type alias for mail source operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors that can occur while talking to the mail server.
///
/// Unlike LLM failures these are fatal to a run: there is no partial-result
/// contract when the mailbox is unreachable.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Authentication failed or credentials rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Server rejected or garbled a protocol exchange.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Trait for mailbox backends.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetches unseen emails dated within the trailing `days` window,
    /// newest first, capped at `limit`.
    ///
    /// Returned records carry a decoded plain-text body regardless of the
    /// original MIME structure. Messages without a usable mailbox-local id
    /// are dropped here, not surfaced.
    async fn fetch_unread(&self, limit: u32, days: u32) -> Result<Vec<EmailRecord>>;

    /// Marks a single email as seen.
    async fn mark_seen(&self, id: &EmailId) -> Result<()>;
}
