//! Monitor service: the per-run processing loop.
//!
//! One run fetches unseen mail, scores and decides each email in sequence,
//! fires alerts for phishing verdicts, marks emails seen, and persists the
//! processed-id set. Emails are processed one at a time; the external AI
//! call is blocking per email, and any AI failure degrades to the fallback
//! verdict rather than aborting the run.

use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use crate::alert::AlertSink;
use crate::analysis::{DecisionPolicy, HeuristicScorer};
use crate::domain::{Action, DecisionOutcome, EmailRecord};
use crate::providers::ai::{CompletionRequest, LlmProvider, Message};
use crate::providers::mail::{MailError, MailSource};
use crate::store::{ProcessedIdStore, StoreError};

/// Character budget for the email body inside the LLM prompt.
const BODY_PROMPT_BUDGET: usize = 1500;

/// Maximum tokens requested from the LLM per analysis.
const ANALYSIS_MAX_TOKENS: usize = 500;

/// Sampling temperature for analysis completions.
const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// System prompt framing the analysis request.
const ANALYST_SYSTEM_PROMPT: &str = "You are a senior cybersecurity analyst. \
     Analyze emails carefully and be specific. Do not give generic answers.";

/// Errors that abort a whole run.
///
/// Recoverable conditions (AI failure, alert failure, duplicate ids) are
/// handled inside the loop and never reach the caller.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Mailbox unreachable or protocol failure.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Processed-id store unreadable or unwritable.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Outcome of one full monitoring pass.
#[derive(Debug)]
pub enum RunReport {
    /// No new unseen emails were processed; nothing was persisted.
    Idle,
    /// At least one email was processed and the id set was persisted.
    Completed(Vec<DecisionOutcome>),
}

impl RunReport {
    /// Outcomes for this run, empty when idle.
    pub fn outcomes(&self) -> &[DecisionOutcome] {
        match self {
            RunReport::Idle => &[],
            RunReport::Completed(outcomes) => outcomes,
        }
    }
}

/// Fetch window settings for one run.
#[derive(Debug, Clone, Copy)]
pub struct FetchWindow {
    /// Maximum number of unseen emails per run.
    pub limit: u32,
    /// Trailing window in days.
    pub days: u32,
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self { limit: 10, days: 7 }
    }
}

/// Orchestrates one monitoring pass over the mailbox.
///
/// Generic over its collaborators so tests can drive it with in-memory
/// implementations; the LLM backend is type-erased because it is chosen at
/// runtime from settings.
pub struct MonitorService<M, A, S> {
    mail: M,
    alerts: A,
    store: S,
    llm: Arc<dyn LlmProvider>,
    scorer: HeuristicScorer,
    policy: DecisionPolicy,
    window: FetchWindow,
}

impl<M, A, S> MonitorService<M, A, S>
where
    M: MailSource,
    A: AlertSink,
    S: ProcessedIdStore,
{
    /// Creates a monitor with default scorer/policy vocabularies.
    pub fn new(mail: M, alerts: A, store: S, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            mail,
            alerts,
            store,
            llm,
            scorer: HeuristicScorer::default(),
            policy: DecisionPolicy::default(),
            window: FetchWindow::default(),
        }
    }

    /// Overrides the heuristic scorer.
    pub fn with_scorer(mut self, scorer: HeuristicScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Overrides the decision policy.
    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the fetch window.
    pub fn with_window(mut self, window: FetchWindow) -> Self {
        self.window = window;
        self
    }

    /// Executes one full pass: fetch, score, decide, alert, mark seen,
    /// persist.
    ///
    /// Returns [`RunReport::Idle`] without touching the store when nothing
    /// new was processed. Mail-source and store failures abort the run.
    pub async fn run_once(&self) -> MonitorResult<RunReport> {
        let processed = self.store.load().await?;
        let emails = self
            .mail
            .fetch_unread(self.window.limit, self.window.days)
            .await?;

        tracing::info!(
            fetched = emails.len(),
            known = processed.len(),
            "monitor run started"
        );

        let mut results = Vec::new();
        let mut newly_processed: HashSet<String> = HashSet::new();

        for email in &emails {
            let key = email.dedupe_key().to_string();
            if key.is_empty() || processed.contains(&key) || newly_processed.contains(&key) {
                tracing::debug!(id = %email.id, "skipping already-processed email");
                continue;
            }

            let heuristic = self.scorer.score(email);
            let raw_ai_text = self.analyze(email).await;
            let decision = self
                .policy
                .decide(email, &heuristic, raw_ai_text.as_deref());

            tracing::debug!(
                id = %email.id,
                score = heuristic.score,
                tier = ?decision.tier,
                phishing = decision.verdict.is_phishing,
                "email decided"
            );

            if decision.action == Action::AlertSent {
                // Alert failure is isolated: one undeliverable alert must
                // not abort the remaining emails in the batch.
                if let Err(e) = self
                    .alerts
                    .send_alert(email, &heuristic, &decision.verdict)
                    .await
                {
                    tracing::warn!(id = %email.id, error = %e, "alert delivery failed");
                }
            }

            self.mail.mark_seen(&email.id).await?;

            newly_processed.insert(key);
            results.push(DecisionOutcome {
                email: email.clone(),
                heuristic,
                ai_analysis: decision.verdict,
                action: decision.action,
            });
        }

        if newly_processed.is_empty() {
            tracing::info!("monitor run idle, nothing new to process");
            return Ok(RunReport::Idle);
        }

        // Union, not overwrite: ids from prior runs stay remembered.
        let merged: HashSet<String> = processed.union(&newly_processed).cloned().collect();
        self.store.save(&merged).await?;

        tracing::info!(processed = results.len(), "monitor run completed");
        Ok(RunReport::Completed(results))
    }

    /// Calls the LLM backend for one email, returning its raw text.
    ///
    /// `None` on any failure; the interpreter turns that into the fallback
    /// verdict. The heuristic result is not sent to the model, it only
    /// shapes the interpretation afterward.
    async fn analyze(&self, email: &EmailRecord) -> Option<String> {
        let request = CompletionRequest::new(vec![Message::user(build_user_prompt(email))])
            .with_system_prompt(ANALYST_SYSTEM_PROMPT)
            .with_temperature(ANALYSIS_TEMPERATURE)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);

        match self.llm.complete(&request).await {
            Ok(response) => {
                let text = response.text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                tracing::warn!(id = %email.id, error = %e, "AI analysis failed, using fallback");
                None
            }
        }
    }
}

/// Builds the analysis prompt for one email, truncating the body to the
/// fixed character budget.
fn build_user_prompt(email: &EmailRecord) -> String {
    let body: String = email.body.chars().take(BODY_PROMPT_BUDGET).collect();
    format!(
        "From: {from}\nSubject: {subject}\nBody:\n{body}\n\n\
         Explain:\n\
         1. What the email is about\n\
         2. Whether it is phishing or legitimate\n\
         3. Why\n",
        from = email.from,
        subject = email.subject,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertError, AlertSink};
    use crate::domain::{AiVerdict, EmailId, HeuristicResult};
    use crate::providers::ai::{
        CompletionResponse, FinishReason, LlmError, LlmResult, TokenUsage,
    };
    use crate::providers::mail::{MailSource, Result as MailResult};
    use crate::store::Result as StoreResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockMail {
        emails: Vec<EmailRecord>,
        seen: Mutex<Vec<EmailId>>,
    }

    impl MockMail {
        fn new(emails: Vec<EmailRecord>) -> Self {
            Self {
                emails,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailSource for MockMail {
        async fn fetch_unread(&self, limit: u32, _days: u32) -> MailResult<Vec<EmailRecord>> {
            Ok(self.emails.iter().take(limit as usize).cloned().collect())
        }

        async fn mark_seen(&self, id: &EmailId) -> MailResult<()> {
            self.seen.lock().unwrap().push(id.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAlerts {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertSink for MockAlerts {
        async fn send_alert(
            &self,
            email: &EmailRecord,
            _heuristic: &HeuristicResult,
            _verdict: &AiVerdict,
        ) -> crate::alert::Result<()> {
            if self.fail {
                return Err(AlertError::Delivery("relay down".to_string()));
            }
            self.sent.lock().unwrap().push(email.from.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockStore {
        ids: Mutex<HashSet<String>>,
        saves: Mutex<u32>,
    }

    #[async_trait]
    impl ProcessedIdStore for MockStore {
        async fn load(&self) -> StoreResult<HashSet<String>> {
            Ok(self.ids.lock().unwrap().clone())
        }

        async fn save(&self, ids: &HashSet<String>) -> StoreResult<()> {
            *self.ids.lock().unwrap() = ids.clone();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct MockLlm {
        reply: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete(&self, _request: &CompletionRequest) -> LlmResult<CompletionResponse> {
            match &self.reply {
                Some(text) => Ok(CompletionResponse {
                    text: text.clone(),
                    tokens_used: TokenUsage::default(),
                    finish_reason: FinishReason::Stop,
                }),
                None => Err(LlmError::Unavailable("backend offline".to_string())),
            }
        }
    }

    fn email(id: &str, message_id: Option<&str>, from: &str, subject: &str, body: &str) -> EmailRecord {
        EmailRecord {
            id: EmailId::from(id),
            message_id: message_id.map(Into::into),
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            date_raw: None,
            date: None,
        }
    }

    fn phishing_email(id: &str) -> EmailRecord {
        email(
            id,
            Some(format!("<{}@evil.example>", id).as_str()),
            "security@unknown.biz",
            "URGENT: verify your account now",
            "click here: http://evil.example/login",
        )
    }

    const PHISHING_REPLY: &str = "This is a phishing email. It pressures the reader with \
         urgent language and a credential-stealing link.";

    #[tokio::test]
    async fn idle_run_skips_persistence() {
        let service = MonitorService::new(
            MockMail::new(vec![]),
            MockAlerts::default(),
            MockStore::default(),
            Arc::new(MockLlm { reply: None }),
        );

        let report = service.run_once().await.unwrap();
        assert!(matches!(report, RunReport::Idle));
        assert_eq!(*service.store.saves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn phishing_email_triggers_alert_and_mark_seen() {
        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1")]),
            MockAlerts::default(),
            MockStore::default(),
            Arc::new(MockLlm {
                reply: Some(PHISHING_REPLY.to_string()),
            }),
        );

        let report = service.run_once().await.unwrap();
        let outcomes = report.outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].action, Action::AlertSent);
        assert!(outcomes[0].ai_analysis.is_phishing);

        assert_eq!(service.alerts.sent.lock().unwrap().len(), 1);
        assert_eq!(
            *service.mail.seen.lock().unwrap(),
            vec![EmailId::from("1")]
        );
        assert!(service
            .store
            .ids
            .lock()
            .unwrap()
            .contains("<1@evil.example>"));
    }

    #[tokio::test]
    async fn trusted_sender_never_alerts() {
        let service = MonitorService::new(
            MockMail::new(vec![email(
                "1",
                None,
                "alerts@google.com",
                "Account Update",
                "Please review your account.",
            )]),
            MockAlerts::default(),
            MockStore::default(),
            Arc::new(MockLlm {
                reply: Some(PHISHING_REPLY.to_string()),
            }),
        );

        let report = service.run_once().await.unwrap();
        let outcomes = report.outcomes();
        assert_eq!(outcomes[0].action, Action::NoAction);
        assert!(!outcomes[0].ai_analysis.is_phishing);
        assert!(outcomes[0].ai_analysis.confidence >= 70);
        assert!(service.alerts.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_are_skipped() {
        let store = MockStore::default();
        store
            .ids
            .lock()
            .unwrap()
            .insert("<1@evil.example>".to_string());

        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1")]),
            MockAlerts::default(),
            store,
            Arc::new(MockLlm { reply: None }),
        );

        let report = service.run_once().await.unwrap();
        assert!(matches!(report, RunReport::Idle));
        assert!(service.mail.seen.lock().unwrap().is_empty());
        assert!(service.alerts.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_id_twice_in_one_run_processed_once() {
        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1"), phishing_email("1")]),
            MockAlerts::default(),
            MockStore::default(),
            Arc::new(MockLlm {
                reply: Some(PHISHING_REPLY.to_string()),
            }),
        );

        let report = service.run_once().await.unwrap();
        assert_eq!(report.outcomes().len(), 1);
        assert_eq!(service.alerts.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn alert_failure_does_not_abort_batch() {
        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1"), phishing_email("2")]),
            MockAlerts {
                fail: true,
                ..Default::default()
            },
            MockStore::default(),
            Arc::new(MockLlm {
                reply: Some(PHISHING_REPLY.to_string()),
            }),
        );

        let report = service.run_once().await.unwrap();
        // Both emails complete despite the broken alert sink.
        assert_eq!(report.outcomes().len(), 2);
        assert_eq!(service.mail.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_on_heuristics() {
        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1")]),
            MockAlerts::default(),
            MockStore::default(),
            Arc::new(MockLlm { reply: None }),
        );

        let report = service.run_once().await.unwrap();
        let outcomes = report.outcomes();
        // Heuristic score is 9; fallback flags phishing at >= 5.
        assert!(outcomes[0].ai_analysis.is_phishing);
        assert_eq!(outcomes[0].action, Action::AlertSent);
        assert!(outcomes[0]
            .ai_analysis
            .explanation
            .contains("unavailable"));
    }

    #[tokio::test]
    async fn persisted_ids_accumulate_across_runs() {
        let store = MockStore::default();
        store.ids.lock().unwrap().insert("old-id".to_string());

        let service = MonitorService::new(
            MockMail::new(vec![phishing_email("1")]),
            MockAlerts::default(),
            store,
            Arc::new(MockLlm {
                reply: Some(PHISHING_REPLY.to_string()),
            }),
        );

        service.run_once().await.unwrap();
        let ids = service.store.ids.lock().unwrap();
        assert!(ids.contains("old-id"));
        assert!(ids.contains("<1@evil.example>"));
    }

    #[test]
    fn user_prompt_truncates_body() {
        let long_body = "x".repeat(5000);
        let rec = email("1", None, "a@b.c", "s", &long_body);
        let prompt = build_user_prompt(&rec);
        assert!(prompt.len() < 5000);
        assert!(prompt.contains("Whether it is phishing or legitimate"));
    }
}
