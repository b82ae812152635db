//! End-to-end pipeline tests with in-memory collaborators.
//!
//! Each test drives a full monitor run: fetch, heuristics, AI
//! interpretation, tiered decision, alert delivery, and processed-id
//! persistence.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use mailsentry::alert::{AlertSink, Result as AlertResult};
use mailsentry::domain::{Action, AiVerdict, EmailId, EmailRecord, HeuristicResult};
use mailsentry::providers::ai::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, LlmResult,
    TokenUsage,
};
use mailsentry::providers::mail::{MailSource, Result as MailResult};
use mailsentry::services::{MonitorService, RunReport};
use mailsentry::store::{ProcessedIdStore, Result as StoreResult};

#[derive(Clone)]
struct FakeMailbox {
    emails: Arc<Mutex<Vec<EmailRecord>>>,
    seen: Arc<Mutex<Vec<EmailId>>>,
}

impl FakeMailbox {
    fn new(emails: Vec<EmailRecord>) -> Self {
        Self {
            emails: Arc::new(Mutex::new(emails)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl MailSource for FakeMailbox {
    async fn fetch_unread(&self, limit: u32, _days: u32) -> MailResult<Vec<EmailRecord>> {
        Ok(self
            .emails
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_seen(&self, id: &EmailId) -> MailResult<()> {
        self.seen.lock().unwrap().push(id.clone());
        Ok(())
    }
}

#[derive(Clone)]
struct FakeAlerts {
    sent: Arc<Mutex<Vec<(String, bool)>>>,
}

impl FakeAlerts {
    fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AlertSink for FakeAlerts {
    async fn send_alert(
        &self,
        email: &EmailRecord,
        _heuristic: &HeuristicResult,
        verdict: &AiVerdict,
    ) -> AlertResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.from.clone(), verdict.is_phishing));
        Ok(())
    }
}

#[derive(Clone)]
struct FakeStore {
    ids: Arc<Mutex<HashSet<String>>>,
    saves: Arc<Mutex<u32>>,
}

impl FakeStore {
    fn new() -> Self {
        Self {
            ids: Arc::new(Mutex::new(HashSet::new())),
            saves: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl ProcessedIdStore for FakeStore {
    async fn load(&self) -> StoreResult<HashSet<String>> {
        Ok(self.ids.lock().unwrap().clone())
    }

    async fn save(&self, ids: &HashSet<String>) -> StoreResult<()> {
        *self.ids.lock().unwrap() = ids.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

struct FakeLlm {
    reply: Option<&'static str>,
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, _request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        match self.reply {
            Some(text) => Ok(CompletionResponse {
                text: text.to_string(),
                tokens_used: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
            }),
            None => Err(LlmError::Unavailable("backend offline".to_string())),
        }
    }
}

fn email(id: &str, from: &str, subject: &str, body: &str) -> EmailRecord {
    EmailRecord {
        id: EmailId::from(id),
        message_id: Some(format!("<{}@test.example>", id).into()),
        from: from.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        date_raw: None,
        date: None,
    }
}

const PHISHING_REPLY: &str = "This is a phishing email. It impersonates a bank and pushes \
     the reader toward a credential-stealing login link with urgent language.";

const BENIGN_REPLY: &str = "This email is a routine legitimate newsletter about project \
     updates. Nothing in it suggests an attempt to mislead the recipient.";

/// Trusted sender domain forces a safe verdict and suppresses the alert,
/// even when the AI text says phishing.
#[tokio::test]
async fn trusted_sender_is_never_flagged() {
    let mailbox = FakeMailbox::new(vec![email(
        "1",
        "Security <no-reply@accounts.google.com>",
        "URGENT: verify your account password",
        "Click here to login: http://accounts.google.com/verify",
    )]);
    let alerts = FakeAlerts::new();
    let store = FakeStore::new();
    let service = MonitorService::new(
        mailbox.clone(),
        alerts.clone(),
        store.clone(),
        Arc::new(FakeLlm {
            reply: Some(PHISHING_REPLY),
        }),
    );

    let report = service.run_once().await.unwrap();
    let outcomes = report.outcomes();

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].ai_analysis.is_phishing);
    assert!(outcomes[0].ai_analysis.confidence >= 70);
    assert_eq!(outcomes[0].ai_analysis.explanation, "Sender domain is trusted.");
    assert_eq!(outcomes[0].action, Action::NoAction);
    assert!(alerts.sent.lock().unwrap().is_empty());
}

/// A completely innocuous email from an untrusted domain scores only the
/// domain penalty, stays below the elevated threshold, and reports a
/// confidence proportional to its score.
#[tokio::test]
async fn low_risk_email_forced_safe() {
    let mailbox = FakeMailbox::new(vec![email(
        "2",
        "colleague@smallbiz.example",
        "Lunch tomorrow?",
        "Want to grab lunch at noon?",
    )]);
    let alerts = FakeAlerts::new();
    let store = FakeStore::new();
    let service = MonitorService::new(
        mailbox,
        alerts.clone(),
        store,
        Arc::new(FakeLlm {
            reply: Some(BENIGN_REPLY),
        }),
    );

    let report = service.run_once().await.unwrap();
    let outcomes = report.outcomes();

    // Untrusted domain alone scores 2, below the elevated threshold of 4.
    assert_eq!(outcomes[0].heuristic.score, 2);
    assert!(!outcomes[0].ai_analysis.is_phishing);
    assert_eq!(outcomes[0].ai_analysis.confidence, 10);
    assert_eq!(outcomes[0].action, Action::NoAction);
    assert!(alerts.sent.lock().unwrap().is_empty());
}

/// A heavily suspicious email with an AI phishing verdict sends exactly one
/// alert and is marked seen.
#[tokio::test]
async fn elevated_phishing_email_alerts_admin() {
    let mailbox = FakeMailbox::new(vec![email(
        "3",
        "IT Support <helpdesk@corp-support.biz>",
        "URGENT: your account is suspended",
        "Your password expired. Click here to verify and login: http://fake.example/reset",
    )]);
    let alerts = FakeAlerts::new();
    let store = FakeStore::new();
    let service = MonitorService::new(
        mailbox.clone(),
        alerts.clone(),
        store.clone(),
        Arc::new(FakeLlm {
            reply: Some(PHISHING_REPLY),
        }),
    );

    let report = service.run_once().await.unwrap();
    let outcomes = report.outcomes();

    assert!(outcomes[0].heuristic.score >= 4);
    assert!(outcomes[0].ai_analysis.is_phishing);
    assert_eq!(outcomes[0].action, Action::AlertSent);

    let sent = alerts.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1);

    assert_eq!(*mailbox.seen.lock().unwrap(), vec![EmailId::from("3")]);
    assert!(store.ids.lock().unwrap().contains("<3@test.example>"));
}

/// When the AI backend is down, the fallback verdict still classifies a
/// high-scoring email as phishing and carries the unavailability notice.
#[tokio::test]
async fn fallback_verdict_when_backend_unavailable() {
    let mailbox = FakeMailbox::new(vec![email(
        "4",
        "billing@payments-alert.biz",
        "Security alert: account suspended",
        "Verify your login: http://payments-alert.biz/confirm",
    )]);
    let alerts = FakeAlerts::new();
    let store = FakeStore::new();
    let service = MonitorService::new(
        mailbox,
        alerts.clone(),
        store,
        Arc::new(FakeLlm { reply: None }),
    );

    let report = service.run_once().await.unwrap();
    let outcomes = report.outcomes();

    assert!(outcomes[0].ai_analysis.is_phishing);
    assert_eq!(outcomes[0].ai_analysis.summary, "AI analysis could not be completed.");
    assert!(outcomes[0].ai_analysis.explanation.contains("unavailable"));
    assert_eq!(outcomes[0].action, Action::AlertSent);
    assert_eq!(alerts.sent.lock().unwrap().len(), 1);
}

/// The second run over the same mailbox is idle: everything is already in
/// the processed-id set, and the idle run does not rewrite the store.
#[tokio::test]
async fn second_run_is_idle_and_skips_persistence() {
    let mailbox = FakeMailbox::new(vec![email(
        "5",
        "noreply@newsletter.example",
        "Weekly digest",
        "Here is what happened this week.",
    )]);
    let alerts = FakeAlerts::new();
    let store = FakeStore::new();
    let service = MonitorService::new(
        mailbox,
        alerts,
        store.clone(),
        Arc::new(FakeLlm {
            reply: Some(BENIGN_REPLY),
        }),
    );

    let first = service.run_once().await.unwrap();
    assert_eq!(first.outcomes().len(), 1);
    assert_eq!(*store.saves.lock().unwrap(), 1);

    let second = service.run_once().await.unwrap();
    assert!(matches!(second, RunReport::Idle));
    assert_eq!(*store.saves.lock().unwrap(), 1);
}
