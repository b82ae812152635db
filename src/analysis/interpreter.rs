//! AI response interpretation.
//!
//! Normalizes the raw text returned by the LLM backend (or its absence)
//! into an [`AiVerdict`]. This function never fails: a missing, errored, or
//! abnormally short response degrades to a heuristic-only fallback verdict.

use crate::domain::{AiVerdict, HeuristicResult, Tactic};

/// Responses shorter than this are treated as invalid and trigger the
/// fallback path.
pub const MIN_VALID_RESPONSE_LEN: usize = 50;

/// Phrases that mark the response as a phishing verdict.
const PHISHING_PHRASES: &[&str] = &[
    "this is a phishing",
    "phishing email",
    "scam",
    "fraud",
    "attempts to deceive",
    "malicious",
];

/// Summary placeholder for the fallback path.
const FALLBACK_SUMMARY: &str = "AI analysis could not be completed.";

/// Explanation placeholder for the fallback path.
const FALLBACK_EXPLANATION: &str =
    "The AI service was unavailable, so a heuristic-based assessment was used.";

/// Normalizes a raw AI response into a verdict.
///
/// `raw` is `None` when the external call errored or timed out; a response
/// shorter than [`MIN_VALID_RESPONSE_LEN`] characters counts as absent too.
pub fn interpret(raw: Option<&str>, heuristic: &HeuristicResult) -> AiVerdict {
    let verdict = match raw {
        Some(text) if text.chars().count() >= MIN_VALID_RESPONSE_LEN => {
            interpret_text(text, heuristic)
        }
        _ => fallback(heuristic),
    };
    verdict.enforce_fields()
}

/// Heuristic-only verdict used when no valid AI text is available.
fn fallback(heuristic: &HeuristicResult) -> AiVerdict {
    AiVerdict {
        is_phishing: heuristic.score >= 5,
        confidence: clamp_confidence(heuristic.score.saturating_mul(10).min(80)),
        summary: FALLBACK_SUMMARY.to_string(),
        tactics: Vec::new(),
        explanation: FALLBACK_EXPLANATION.to_string(),
    }
}

/// Interprets a valid AI response.
fn interpret_text(text: &str, heuristic: &HeuristicResult) -> AiVerdict {
    let lower = text.to_lowercase();

    let is_phishing = PHISHING_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase));

    let confidence = if is_phishing {
        (75 + heuristic.score * 5).min(95)
    } else {
        (heuristic.score * 5).max(20)
    };

    let mut tactics = Vec::new();
    if lower.contains("link") || !heuristic.urls.is_empty() {
        tactics.push(Tactic::LinkManipulation);
    }
    if lower.contains("impersonat") {
        tactics.push(Tactic::Impersonation);
    }
    if lower.contains("credential") || lower.contains("password") {
        tactics.push(Tactic::CredentialHarvesting);
    }
    if lower.contains("urgent") {
        tactics.push(Tactic::Urgency);
    }

    AiVerdict {
        is_phishing,
        confidence: clamp_confidence(confidence),
        summary: first_two_sentences(text),
        tactics,
        explanation: text.to_string(),
    }
}

/// Joins the first two sentences of `text`, fewer if the text has fewer.
///
/// Sentence boundaries are `.`, `!`, or `?` followed by whitespace.
fn first_two_sentences(text: &str) -> String {
    let mut sentences: Vec<&str> = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;

    for (idx, ch) in text.char_indices() {
        if prev_was_terminator && ch.is_whitespace() {
            let sentence = text[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
                if sentences.len() == 2 {
                    return sentences.join(" ");
                }
            }
            start = idx;
        }
        prev_was_terminator = matches!(ch, '.' | '!' | '?');
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences.truncate(2);
    sentences.join(" ")
}

/// Clamps an integer confidence value into the 0..=100 verdict range.
fn clamp_confidence(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}
