//! Risk-scoring and decision pipeline.
//!
//! Three stages, leaves first:
//!
//! 1. [`HeuristicScorer`]: keyword/URL/domain scoring, pure.
//! 2. [`interpret`]: normalizes the raw LLM response (or its absence)
//!    into an [`crate::domain::AiVerdict`], never fails.
//! 3. [`DecisionPolicy`]: trust check, low-risk short-circuit, or
//!    AI-assisted elevation into an action.

mod heuristics;
mod interpreter;
mod policy;

pub use heuristics::{sender_domain, HeuristicScorer, SCORER_TRUSTED_DOMAINS, SUSPICIOUS_KEYWORDS};
pub use interpreter::{interpret, MIN_VALID_RESPONSE_LEN};
pub use policy::{
    Decision, DecisionPolicy, Tier, ELEVATED_RISK_THRESHOLD, TRUSTED_SENDER_DOMAINS,
};
