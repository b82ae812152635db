//! Mail source implementations.
//!
//! The [`MailSource`] trait abstracts the mailbox backend; [`ImapSource`]
//! implements it over IMAP4rev1 with rustls TLS.

mod imap;
mod traits;

pub use imap::{ImapConfig, ImapSource};
pub use traits::{MailError, MailSource, Result};
