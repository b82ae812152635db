//! SMTP alert sink.
//!
//! Sends the phishing alert to the admin mailbox over SMTPS via lettre.

use async_trait::async_trait;
use lettre::message::{Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{AlertError, AlertSink, Result};
use crate::domain::{AiVerdict, EmailRecord, HeuristicResult};

/// SMTP configuration for outgoing alerts.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (typically 465 for TLS).
    pub port: u16,
    /// Username for SMTP auth; also the alert's From address.
    pub username: String,
    /// Password or app-specific password.
    pub password: String,
    /// Recipient of alert emails.
    pub admin_email: String,
}

/// lettre-backed [`AlertSink`].
pub struct SmtpAlertSink {
    config: SmtpConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpAlertSink {
    /// Creates a sink over an SMTPS relay.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let credentials =
            SmtpCredentials::new(config.username.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| AlertError::Delivery(format!("SMTP relay error: {}", e)))?
            .credentials(credentials)
            .port(config.port)
            .build();

        Ok(Self { config, mailer })
    }

    fn build_message(
        &self,
        email: &EmailRecord,
        heuristic: &HeuristicResult,
        verdict: &AiVerdict,
    ) -> Result<Message> {
        let from: Mailbox = self
            .config
            .username
            .parse()
            .map_err(|e| AlertError::InvalidMessage(format!("invalid from address: {}", e)))?;
        let to: Mailbox = self
            .config
            .admin_email
            .parse()
            .map_err(|e| AlertError::InvalidMessage(format!("invalid admin address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject("Phishing Alert Detected")
            .singlepart(SinglePart::plain(format_alert_body(
                email, heuristic, verdict,
            )))
            .map_err(|e| AlertError::InvalidMessage(format!("failed to build alert: {}", e)))
    }
}

/// Renders the plain-text alert body.
pub fn format_alert_body(
    email: &EmailRecord,
    heuristic: &HeuristicResult,
    verdict: &AiVerdict,
) -> String {
    format!(
        "PHISHING ALERT\n\
         \n\
         Sender:\n{from}\n\
         \n\
         Subject:\n{subject}\n\
         \n\
         Detected URLs:\n{urls}\n\
         \n\
         Heuristic Risk Score:\n{score}\n\
         \n\
         AI Verdict:\n\
         Phishing: {phishing}\n\
         Confidence: {confidence}%\n\
         \n\
         Summary:\n{summary}\n\
         \n\
         Explanation:\n{explanation}\n\
         \n\
         ---\n\
         This alert was generated automatically by the phishing monitor.\n",
        from = email.from,
        subject = email.subject,
        urls = heuristic.urls.join(", "),
        score = heuristic.score,
        phishing = verdict.is_phishing,
        confidence = verdict.confidence,
        summary = verdict.summary,
        explanation = verdict.explanation,
    )
}

#[async_trait]
impl AlertSink for SmtpAlertSink {
    async fn send_alert(
        &self,
        email: &EmailRecord,
        heuristic: &HeuristicResult,
        verdict: &AiVerdict,
    ) -> Result<()> {
        let message = self.build_message(email, heuristic, verdict)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AlertError::Delivery(format!("SMTP send failed: {}", e)))?;

        tracing::info!(sender = %email.from, "phishing alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AiVerdict, EmailId, Tactic};

    #[test]
    fn alert_body_contains_all_sections() {
        let email = EmailRecord {
            id: EmailId::from("1"),
            message_id: None,
            from: "security@unknown.biz".to_string(),
            subject: "URGENT: verify your account".to_string(),
            body: "click here".to_string(),
            date_raw: None,
            date: None,
        };
        let heuristic = HeuristicResult::new(
            7,
            vec!["http://evil.example/login".to_string()],
            vec!["Contains URL(s)".to_string()],
        );
        let verdict = AiVerdict {
            is_phishing: true,
            confidence: 88,
            summary: "Credential phishing attempt.".to_string(),
            tactics: vec![Tactic::CredentialHarvesting],
            explanation: "The email impersonates a bank.".to_string(),
        };

        let body = format_alert_body(&email, &heuristic, &verdict);

        assert!(body.contains("security@unknown.biz"));
        assert!(body.contains("URGENT: verify your account"));
        assert!(body.contains("http://evil.example/login"));
        assert!(body.contains("Phishing: true"));
        assert!(body.contains("Confidence: 88%"));
        assert!(body.contains("Credential phishing attempt."));
        assert!(body.contains("impersonates a bank"));
    }
}
