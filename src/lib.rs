//! mailsentry - An autonomous phishing email analyzer and reporter
//!
//! This crate watches an IMAP mailbox for unseen mail, scores each email
//! with keyword/URL/sender heuristics, asks an OpenAI-compatible backend
//! for a second opinion, and emails the administrator when the combined
//! verdict is phishing. A small HTTP surface triggers runs on demand.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod domain;
pub mod providers;
pub mod server;
pub mod services;
pub mod store;
