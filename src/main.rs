//! mailsentry - Entry point for the phishing monitor service

use std::sync::Arc;

use anyhow::Context;

use mailsentry::alert::{SmtpAlertSink, SmtpConfig};
use mailsentry::analysis::{DecisionPolicy, HeuristicScorer, SUSPICIOUS_KEYWORDS};
use mailsentry::config::Settings;
use mailsentry::providers::ai::{LlmProvider, OpenAiCompatibleProvider};
use mailsentry::providers::mail::{ImapConfig, ImapSource};
use mailsentry::server::{self, AppState};
use mailsentry::services::{FetchWindow, MonitorService};
use mailsentry::store::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting mailsentry");

    let settings = Settings::from_env().context("loading settings from environment")?;

    let mut mail = ImapSource::new(ImapConfig {
        host: settings.imap.host.clone(),
        port: settings.imap.port,
        username: settings.imap.username.clone(),
        password: settings.imap.password.clone(),
    });
    mail.connect().await.context("connecting to IMAP mailbox")?;

    let alerts = SmtpAlertSink::new(SmtpConfig {
        host: settings.smtp.host.clone(),
        port: settings.smtp.port,
        username: settings.smtp.username.clone(),
        password: settings.smtp.password.clone(),
        admin_email: settings.smtp.admin_email.clone(),
    })
    .context("building SMTP alert transport")?;

    let store = JsonFileStore::new(settings.store_path.clone());

    let llm: Arc<dyn LlmProvider> = match &settings.ai.base_url {
        Some(base_url) => Arc::new(OpenAiCompatibleProvider::custom(
            base_url,
            Some(settings.ai.api_key.clone()),
            settings.ai.model.clone(),
        )),
        None => Arc::new(OpenAiCompatibleProvider::openai(
            settings.ai.api_key.clone(),
            settings.ai.model.clone(),
        )),
    };

    let scorer = HeuristicScorer::new(
        SUSPICIOUS_KEYWORDS.iter().map(|s| s.to_string()),
        settings.analysis.scorer_trusted_domains.iter().cloned(),
    );
    let policy = DecisionPolicy::new(settings.analysis.trusted_sender_domains.iter().cloned());

    let monitor = MonitorService::new(mail, alerts, store, llm)
        .with_scorer(scorer)
        .with_policy(policy)
        .with_window(FetchWindow {
            limit: settings.fetch.limit,
            days: settings.fetch.days,
        });

    let state = Arc::new(AppState::new(monitor));
    server::serve(&settings.bind_addr, state).await
}
