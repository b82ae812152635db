//! Tiered decision policy.
//!
//! Combines the heuristic score and the interpreted AI verdict into a final
//! verdict and action. Three mutually exclusive tiers are evaluated in
//! order: trusted sender, low heuristic risk, elevated risk. The interpreter
//! runs in every tier because its summary, explanation, and tactics are kept
//! for the final output even when its phishing flag is overridden.

use serde::{Deserialize, Serialize};

use super::interpreter;
use crate::domain::{Action, AiVerdict, EmailRecord, HeuristicResult};

/// Heuristic score at or above which an email enters the elevated tier.
pub const ELEVATED_RISK_THRESHOLD: i32 = 4;

/// Confidence floor applied in the trusted-sender tier.
const TRUSTED_CONFIDENCE_FLOOR: u8 = 70;

/// Sender allowlist for the trust tier.
///
/// Broader than the scorer's internal trusted-domain list, and matched
/// loosely (substring of the sender header, not a domain suffix). The
/// looseness is deliberate: mail from notification subdomains of these
/// services should never raise alerts.
pub const TRUSTED_SENDER_DOMAINS: &[&str] = &[
    "google.com",
    "accounts.google.com",
    "linkedin.com",
    "pinterest.com",
    "explore.pinterest.com",
    "mustakbil.com",
    "instagram.com",
    "facebook.com",
    "facebookmail.com",
    "github.com",
    "stackoverflow.com",
    "medium.com",
];

/// Which decision branch an email took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Sender matched the trust allowlist; verdict forced safe.
    TrustedSender,
    /// Heuristic score below the elevated threshold; verdict forced safe.
    LowRisk,
    /// Heuristic score at or above the threshold; AI verdict kept.
    Elevated,
}

/// Final decision for one email.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Verdict after tier overrides.
    pub verdict: AiVerdict,
    /// Action to take.
    pub action: Action,
    /// Branch that produced the decision.
    pub tier: Tier,
}

/// Tiered decision policy.
///
/// Pure given its inputs; the caller performs the alert side effect when
/// `action` is [`Action::AlertSent`].
pub struct DecisionPolicy {
    trusted_senders: Vec<String>,
}

impl DecisionPolicy {
    /// Creates a policy with an explicit sender allowlist.
    pub fn new<I>(trusted_senders: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            trusted_senders: trusted_senders
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    /// Whether the sender header matches the trust allowlist.
    ///
    /// Loose substring match by design, not suffix or equality.
    pub fn is_trusted_sender(&self, sender: &str) -> bool {
        if sender.is_empty() {
            return false;
        }
        let sender = sender.to_lowercase();
        self.trusted_senders
            .iter()
            .any(|domain| sender.contains(domain.as_str()))
    }

    /// Decides the final verdict and action for one email.
    ///
    /// `raw_ai_text` is the LLM response when the external call succeeded
    /// with a usable payload, `None` otherwise.
    pub fn decide(
        &self,
        email: &EmailRecord,
        heuristic: &HeuristicResult,
        raw_ai_text: Option<&str>,
    ) -> Decision {
        let mut verdict = interpreter::interpret(raw_ai_text, heuristic);

        if self.is_trusted_sender(&email.from) {
            verdict.is_phishing = false;
            verdict.confidence = verdict.confidence.max(TRUSTED_CONFIDENCE_FLOOR);
            verdict.explanation = "Sender domain is trusted.".to_string();
            return Decision {
                verdict,
                action: Action::NoAction,
                tier: Tier::TrustedSender,
            };
        }

        if heuristic.score < ELEVATED_RISK_THRESHOLD {
            verdict.is_phishing = false;
            verdict.confidence = (heuristic.score * 5).clamp(0, 100) as u8;
            return Decision {
                verdict,
                action: Action::NoAction,
                tier: Tier::LowRisk,
            };
        }

        let blended = (heuristic.score * 10 + i32::from(verdict.confidence)) / 2;
        verdict.confidence = blended.clamp(0, 100) as u8;

        let action = if verdict.is_phishing {
            Action::AlertSent
        } else {
            Action::NoAction
        };

        Decision {
            verdict,
            action,
            tier: Tier::Elevated,
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(TRUSTED_SENDER_DOMAINS.iter().map(|s| s.to_string()))
    }
}
