//! Heuristic risk scorer.
//!
//! Scores an email from three signal families: suspicious keywords, embedded
//! URLs, and an untrusted sender domain. Deterministic, no I/O; the score
//! feeds both the tier selection in the decision policy and the confidence
//! math in the AI interpreter.

use regex::Regex;

use crate::domain::{EmailRecord, HeuristicResult};

/// Keyword vocabulary checked against the lowercased subject + body.
/// Each distinct match adds 1 to the score.
pub const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "urgent",
    "verify",
    "account",
    "suspended",
    "limited",
    "click",
    "login",
    "password",
    "confirm",
    "security alert",
];

/// Domains the scorer itself considers trustworthy.
///
/// Deliberately smaller than the decision policy's sender allowlist; the
/// scoring penalty and the verdict override are separate concerns with
/// separate vocabularies.
pub const SCORER_TRUSTED_DOMAINS: &[&str] =
    &["google.com", "paypal.com", "microsoft.com", "apple.com"];

/// Flat score added when one or more URLs are present.
const URL_SCORE: i32 = 2;

/// Score added when the sender domain matches no trusted suffix.
const UNTRUSTED_DOMAIN_SCORE: i32 = 2;

/// Extracts the domain part of a sender header value.
///
/// Takes everything after the last `@`, strips any `>` left over from an
/// angle-bracketed address, and lowercases. Empty when there is no `@`.
pub fn sender_domain(sender: &str) -> String {
    match sender.rsplit_once('@') {
        Some((_, rest)) => rest.replace('>', "").trim().to_lowercase(),
        None => String::new(),
    }
}

/// Keyword/URL/domain scorer.
///
/// The keyword and trusted-domain lists are injected so tests and deployments
/// can vary them; [`HeuristicScorer::default`] uses the built-in vocabulary.
pub struct HeuristicScorer {
    keywords: Vec<String>,
    trusted_domains: Vec<String>,
    url_re: Regex,
}

impl HeuristicScorer {
    /// Creates a scorer with explicit keyword and trusted-domain lists.
    pub fn new<K, D>(keywords: K, trusted_domains: D) -> Self
    where
        K: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            trusted_domains: trusted_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
            // Compiled once; the pattern is a constant so this cannot fail.
            #[allow(clippy::unwrap_used)]
            url_re: Regex::new(r"https?://\S+").unwrap(),
        }
    }

    /// Scores a single email. Never errors; empty inputs yield score 0.
    pub fn score(&self, email: &EmailRecord) -> HeuristicResult {
        let mut score = 0;
        let mut reasons = Vec::new();

        let text = format!("{} {}", email.subject, email.body).to_lowercase();

        // Presence-based keyword check: each distinct term counts once.
        for keyword in &self.keywords {
            if text.contains(keyword.as_str()) {
                score += 1;
                reasons.push(format!("Suspicious keyword: {}", keyword));
            }
        }

        let urls: Vec<String> = self
            .url_re
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .collect();
        if !urls.is_empty() {
            score += URL_SCORE;
            reasons.push("Contains URL(s)".to_string());
        }

        let domain = sender_domain(&email.from);
        if !domain.is_empty()
            && !self
                .trusted_domains
                .iter()
                .any(|trusted| domain.ends_with(trusted.as_str()))
        {
            score += UNTRUSTED_DOMAIN_SCORE;
            reasons.push(format!("Untrusted sender domain: {}", domain));
        }

        HeuristicResult::new(score, urls, reasons)
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(
            SUSPICIOUS_KEYWORDS.iter().map(|s| s.to_string()),
            SCORER_TRUSTED_DOMAINS.iter().map(|s| s.to_string()),
        )
    }
}
