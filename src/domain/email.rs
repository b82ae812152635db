//! Email domain types.
//!
//! Represents the normalized email record that enters the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EmailId, MessageId};

/// A normalized unread email fetched from the mail source.
///
/// The body is plain text, already decoded from any transport or markup
/// encoding by the mail source. Records without a mailbox-local id never
/// enter the pipeline; the mail source drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRecord {
    /// Mailbox-local identifier.
    pub id: EmailId,
    /// RFC 5322 Message-ID header, if the originating system set one.
    pub message_id: Option<MessageId>,
    /// Raw sender header value (may include a display name).
    pub from: String,
    /// Decoded subject line.
    pub subject: String,
    /// Decoded plain-text body.
    pub body: String,
    /// Raw Date header value as delivered.
    pub date_raw: Option<String>,
    /// Parsed delivery date, when the Date header was parseable.
    pub date: Option<DateTime<Utc>>,
}

impl EmailRecord {
    /// Resolves the identity used for deduplication.
    ///
    /// Prefers the globally unique Message-ID, falling back to the
    /// mailbox-local id.
    pub fn dedupe_key(&self) -> &str {
        match &self.message_id {
            Some(mid) if !mid.0.is_empty() => &mid.0,
            _ => &self.id.0,
        }
    }
}

/// Collapses runs of whitespace (including CR/LF) into single spaces.
///
/// Applied to subjects and bodies as they come off the wire so the
/// downstream substring checks see uniform text.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
