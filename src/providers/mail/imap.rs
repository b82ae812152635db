//! IMAP mail source implementation.
//!
//! Fetches unseen messages over IMAP4rev1 (RFC 3501) via `async-imap` with
//! rustls TLS, and normalizes them into [`EmailRecord`]s with mail-parser.
//! Bodies are fetched with `BODY.PEEK[]` so the unseen flag is controlled
//! solely by [`MailSource::mark_seen`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use mail_parser::MessageParser;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;

use super::{MailError, MailSource, Result};
use crate::domain::{clean_text, EmailId, EmailRecord, MessageId};

/// IMAP server configuration.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (typically 993 for TLS).
    pub port: u16,
    /// Username (usually the mailbox address).
    pub username: String,
    /// Password or app-specific password.
    pub password: String,
}

/// Type alias for the IMAP session over rustls TLS.
type ImapSession = async_imap::Session<TlsStream<TcpStream>>;

/// IMAP-backed [`MailSource`] watching a single INBOX.
pub struct ImapSource {
    config: ImapConfig,
    session: Option<Arc<Mutex<ImapSession>>>,
}

impl ImapSource {
    /// Creates a new source. Not connected until [`connect`](Self::connect)
    /// is called.
    pub fn new(config: ImapConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Establishes the TLS connection and logs in.
    pub async fn connect(&mut self) -> Result<()> {
        let tcp_stream = TcpStream::connect(format!("{}:{}", self.config.host, self.config.port))
            .await
            .map_err(|e| MailError::Connection(format!("TCP connect failed: {}", e)))?;

        let tls_config = ClientConfig::builder()
            .with_root_certificates(tokio_rustls::rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            ))
            .with_no_client_auth();

        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| MailError::Connection(format!("invalid server name: {}", e)))?;

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| MailError::Connection(format!("TLS handshake failed: {}", e)))?;

        let client = async_imap::Client::new(tls_stream);

        let mut session = client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|e| MailError::Authentication(format!("IMAP login failed: {:?}", e.0)))?;

        session
            .select("INBOX")
            .await
            .map_err(|e| MailError::Protocol(format!("SELECT failed: {}", e)))?;

        self.session = Some(Arc::new(Mutex::new(session)));
        tracing::info!(host = %self.config.host, "IMAP source connected");
        Ok(())
    }

    fn get_session(&self) -> Result<Arc<Mutex<ImapSession>>> {
        self.session
            .clone()
            .ok_or_else(|| MailError::Connection("not connected".to_string()))
    }

    /// Consumes a stream to completion.
    async fn drain_stream<T, E>(
        stream: impl futures::Stream<Item = std::result::Result<T, E>>,
    ) -> std::result::Result<(), E> {
        futures::pin_mut!(stream);
        while let Some(result) = stream.next().await {
            result?;
        }
        Ok(())
    }

    /// Parses a fetched message into an [`EmailRecord`].
    ///
    /// Prefers the text body; falls back to the HTML body converted to
    /// plain text. Subject and body whitespace is normalized before the
    /// record enters the pipeline.
    fn parse_record(uid: u32, raw: &[u8]) -> Option<EmailRecord> {
        let message = MessageParser::default().parse(raw)?;

        let from = message
            .from()
            .and_then(|addrs| addrs.first())
            .map(|addr| match (addr.name(), addr.address()) {
                (Some(name), Some(email)) => format!("{} <{}>", name, email),
                (None, Some(email)) => email.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default();

        let subject = clean_text(message.subject().unwrap_or_default());

        let body = message
            .body_text(0)
            .map(|text| clean_text(&text))
            .or_else(|| {
                message
                    .body_html(0)
                    .map(|html| clean_text(&html_to_text(&html)))
            })
            .unwrap_or_default();

        let date = message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

        Some(EmailRecord {
            id: EmailId::from(uid.to_string()),
            message_id: message
                .message_id()
                .map(|mid| MessageId::from(format!("<{}>", mid))),
            from,
            subject,
            body,
            date_raw: date.map(|d| d.to_rfc2822()),
            date,
        })
    }
}

/// Strips tags from an HTML body, keeping visible text.
///
/// Minimal on purpose: the heuristic scorer only needs the words, not the
/// markup structure.
fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut chars = html.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                in_tag = true;
                // style/script content is invisible text
                let rest: String = chars.clone().take(6).collect::<String>().to_lowercase();
                if rest.starts_with("style") || rest.starts_with("script") {
                    let close = if rest.starts_with("style") {
                        "</style"
                    } else {
                        "</script"
                    };
                    let remaining: String = chars.clone().collect();
                    if let Some(pos) = remaining.to_lowercase().find(close) {
                        for _ in 0..pos {
                            chars.next();
                        }
                    }
                }
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    out
}

#[async_trait]
impl MailSource for ImapSource {
    async fn fetch_unread(&self, limit: u32, days: u32) -> Result<Vec<EmailRecord>> {
        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let since = (Utc::now() - Duration::days(i64::from(days)))
            .format("%d-%b-%Y")
            .to_string();
        let query = format!("UNSEEN SINCE {}", since);

        let uids = session
            .uid_search(&query)
            .await
            .map_err(|e| MailError::Protocol(format!("SEARCH failed: {}", e)))?;

        // Most recent first, capped.
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_by(|a, b| b.cmp(a));
        uid_list.truncate(limit as usize);

        if uid_list.is_empty() {
            return Ok(vec![]);
        }

        let uid_seq = uid_list
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");

        // PEEK keeps the unseen flag untouched until mark_seen runs.
        let fetches = session
            .uid_fetch(&uid_seq, "(UID BODY.PEEK[])")
            .await
            .map_err(|e| MailError::Protocol(format!("FETCH failed: {}", e)))?;

        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let mut records = Vec::new();

        futures::pin_mut!(fetches);
        while let Some(fetch_result) = fetches.next().await {
            let fetch =
                fetch_result.map_err(|e| MailError::Protocol(format!("FETCH failed: {}", e)))?;
            let Some(uid) = fetch.uid else { continue };
            let Some(body) = fetch.body() else { continue };

            if let Some(record) = Self::parse_record(uid, body) {
                // SINCE only filters on the internal date; apply the hard
                // cutoff against the Date header as well.
                if let Some(date) = record.date {
                    if date < cutoff {
                        continue;
                    }
                }
                records.push(record);
            }
        }

        // Stream order is server-defined; restore newest-first.
        records.sort_by_key(|r| std::cmp::Reverse(r.id.0.parse::<u32>().unwrap_or(0)));

        Ok(records)
    }

    async fn mark_seen(&self, id: &EmailId) -> Result<()> {
        let uid: u32 = id
            .0
            .parse()
            .map_err(|_| MailError::InvalidRequest(format!("invalid UID: {}", id)))?;

        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let store_stream = session
            .uid_store(uid.to_string(), "+FLAGS (\\Seen)")
            .await
            .map_err(|e| MailError::Protocol(format!("STORE failed: {}", e)))?;
        Self::drain_stream(store_stream)
            .await
            .map_err(|e| MailError::Protocol(format!("STORE failed: {}", e)))?;

        tracing::debug!(uid = %id, "marked seen");
        Ok(())
    }
}
