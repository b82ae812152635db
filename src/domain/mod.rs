//! Domain layer types for the phishing analyzer.
//!
//! This module contains the core types used throughout the pipeline: the
//! normalized email record, heuristic and AI analysis results, and the
//! per-email decision outcome.

mod analysis;
mod email;
mod types;

pub use analysis::{
    Action, AiVerdict, DecisionOutcome, HeuristicResult, Tactic, DEFAULT_EXPLANATION,
    DEFAULT_SUMMARY, SUSPICION_THRESHOLD,
};
pub use email::{clean_text, EmailRecord};
pub use types::{EmailId, MessageId};
