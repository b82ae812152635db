//! Analysis result types.
//!
//! These are the values produced by the scoring pipeline: the heuristic
//! result, the normalized AI verdict, and the per-email decision outcome.

use serde::{Deserialize, Serialize};

use super::EmailRecord;

/// Score at or above which an email is flagged as suspicious.
pub const SUSPICION_THRESHOLD: i32 = 3;

/// Output of the heuristic scorer for a single email.
///
/// Pure function of the [`EmailRecord`]; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicResult {
    /// Sum of contributing signals.
    pub score: i32,
    /// URLs extracted from the subject and body.
    pub urls: Vec<String>,
    /// Human-readable reasons, one per contributing signal.
    pub reasons: Vec<String>,
    /// Whether the score reached the suspicion threshold.
    pub is_suspicious: bool,
}

impl HeuristicResult {
    /// Builds a result from a score and its supporting signals, deriving
    /// the suspicious flag.
    pub fn new(score: i32, urls: Vec<String>, reasons: Vec<String>) -> Self {
        Self {
            score,
            urls,
            reasons,
            is_suspicious: score >= SUSPICION_THRESHOLD,
        }
    }
}

/// A phishing tactic recognized in the AI's explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tactic {
    #[serde(rename = "link manipulation")]
    LinkManipulation,
    #[serde(rename = "impersonation")]
    Impersonation,
    #[serde(rename = "credential harvesting")]
    CredentialHarvesting,
    #[serde(rename = "urgency")]
    Urgency,
}

/// Normalized verdict derived from the AI backend's raw text (or its
/// absence).
///
/// Summary and explanation are never empty; [`AiVerdict::enforce_fields`]
/// substitutes fixed defaults when the interpretation produced nothing.
/// The decision policy may override `is_phishing` and `confidence`
/// depending on the trust tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiVerdict {
    /// Whether the analysis concluded the email is phishing.
    pub is_phishing: bool,
    /// Confidence in the verdict, 0 to 100.
    pub confidence: u8,
    /// At most two sentences extracted from the explanation.
    pub summary: String,
    /// Recognized phishing tactics, in fixed order, no duplicates.
    pub tactics: Vec<Tactic>,
    /// Full raw analysis text, or a fallback message.
    pub explanation: String,
}

/// Default summary used when interpretation produced no text.
pub const DEFAULT_SUMMARY: &str =
    "The email was analyzed and contains a message directed to the recipient.";

/// Default explanation used when interpretation produced no text.
pub const DEFAULT_EXPLANATION: &str = "The system reviewed the sender, content, links, and \
     structure of the email to determine whether it appears safe or suspicious.";

impl AiVerdict {
    /// Replaces empty summary/explanation with fixed defaults.
    ///
    /// Runs identically on the fallback and interpretation paths so the
    /// non-empty invariant holds before the verdict reaches the decision
    /// policy.
    pub fn enforce_fields(mut self) -> Self {
        if self.summary.trim().is_empty() {
            self.summary = DEFAULT_SUMMARY.to_string();
        }
        if self.explanation.trim().is_empty() {
            self.explanation = DEFAULT_EXPLANATION.to_string();
        }
        self
    }
}

impl Default for AiVerdict {
    fn default() -> Self {
        Self {
            is_phishing: false,
            confidence: 0,
            summary: DEFAULT_SUMMARY.to_string(),
            tactics: Vec::new(),
            explanation: DEFAULT_EXPLANATION.to_string(),
        }
    }
}

/// Action taken for an email after the decision policy ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "No action")]
    NoAction,
    #[serde(rename = "Alert sent")]
    AlertSent,
}

/// Per-email result bundle appended to the run's result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// The email that was processed.
    pub email: EmailRecord,
    /// Heuristic scoring result.
    pub heuristic: HeuristicResult,
    /// Final verdict after any tier overrides.
    pub ai_analysis: AiVerdict,
    /// Action taken.
    pub action: Action,
}
