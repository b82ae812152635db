//! External collaborator implementations.
//!
//! Everything here sits behind a trait so the monitor service can be tested
//! without a network: LLM backends under [`ai`], mailbox backends under
//! [`mail`].

pub mod ai;
pub mod mail;
