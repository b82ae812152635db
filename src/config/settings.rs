//! Application settings.
//!
//! Settings are read from the process environment at startup. Secrets
//! (mailbox password, API key) have no defaults and must be provided;
//! everything else falls back to sensible values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is present but not parseable as its expected type.
    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Result type for settings loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// IMAP mailbox to monitor.
    pub imap: ImapSettings,
    /// SMTP relay used for phishing alerts.
    pub smtp: SmtpSettings,
    /// AI backend configuration.
    pub ai: AiSettings,
    /// Fetch window for each run.
    pub fetch: FetchSettings,
    /// Trusted-domain vocabularies for the analysis pipeline.
    pub analysis: AnalysisSettings,
    /// Path of the processed-id store file.
    pub store_path: PathBuf,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
}

impl Settings {
    /// Loads settings from the environment.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            imap: ImapSettings::from_env()?,
            smtp: SmtpSettings::from_env()?,
            ai: AiSettings::from_env()?,
            fetch: FetchSettings::from_env()?,
            analysis: AnalysisSettings::from_env(),
            store_path: optional("PROCESSED_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("processed_emails.json")),
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string()),
        })
    }
}

/// IMAP mailbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapSettings {
    /// IMAP server hostname.
    pub host: String,
    /// IMAPS port.
    pub port: u16,
    /// Mailbox login.
    pub username: String,
    /// Mailbox password or app password.
    pub password: String,
}

impl ImapSettings {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            host: required("EMAIL_HOST")?,
            port: parsed("EMAIL_PORT", 993)?,
            username: required("EMAIL_USER")?,
            password: required("EMAIL_PASSWORD")?,
        })
    }
}

/// SMTP alert relay configuration.
///
/// The relay reuses the mailbox credentials unless `SMTP_USER` /
/// `SMTP_PASSWORD` override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    /// SMTP server hostname.
    pub host: String,
    /// SMTPS port.
    pub port: u16,
    /// Relay login.
    pub username: String,
    /// Relay password.
    pub password: String,
    /// Recipient of phishing alerts.
    pub admin_email: String,
}

impl SmtpSettings {
    fn from_env() -> ConfigResult<Self> {
        let username = optional("SMTP_USER")
            .map(Ok)
            .unwrap_or_else(|| required("EMAIL_USER"))?;
        let password = optional("SMTP_PASSWORD")
            .map(Ok)
            .unwrap_or_else(|| required("EMAIL_PASSWORD"))?;
        Ok(Self {
            host: optional("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: parsed("SMTP_PORT", 465)?,
            username,
            password,
            admin_email: required("ADMIN_EMAIL")?,
        })
    }
}

/// AI backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub base_url: Option<String>,
    /// API key for the backend.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl AiSettings {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            base_url: optional("AI_BASE_URL"),
            api_key: required("AI_API_KEY")?,
            model: optional("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        })
    }
}

/// Per-run fetch window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Maximum unseen emails fetched per run.
    pub limit: u32,
    /// Trailing window in days for the UNSEEN search.
    pub days: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { limit: 10, days: 7 }
    }
}

impl FetchSettings {
    fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            limit: parsed("FETCH_LIMIT", defaults.limit)?,
            days: parsed("FETCH_DAYS", defaults.days)?,
        })
    }
}

/// Trusted-domain lists for the scorer and the decision policy.
///
/// The two lists stay separate: the scorer's list suppresses the
/// untrusted-domain score penalty, the policy's list forces a safe verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Domains the heuristic scorer treats as trustworthy.
    pub scorer_trusted_domains: Vec<String>,
    /// Sender allowlist for the decision policy's trust tier.
    pub trusted_sender_domains: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            scorer_trusted_domains: crate::analysis::SCORER_TRUSTED_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trusted_sender_domains: crate::analysis::TRUSTED_SENDER_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AnalysisSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scorer_trusted_domains: list("SCORER_TRUSTED_DOMAINS")
                .unwrap_or(defaults.scorer_trusted_domains),
            trusted_sender_domains: list("TRUSTED_SENDER_DOMAINS")
                .unwrap_or(defaults.trusted_sender_domains),
        }
    }
}

fn list(var: &'static str) -> Option<Vec<String>> {
    optional(var).map(|value| {
        value
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect()
    })
}

fn optional(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn required(var: &'static str) -> ConfigResult<String> {
    optional(var).ok_or(ConfigError::MissingVar(var))
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> ConfigResult<T> {
    match optional(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value }),
        None => Ok(default),
    }
}
