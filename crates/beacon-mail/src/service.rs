use crate::{inbox, normalize, outbound, MailError, OutgoingMail};
use beacon_config::{ImapConfig, SmtpConfig};
use beacon_core::NormalizedMessage;
use std::time::Duration;
use tokio::task;

/// Facade over the inbox and outbound collaborators. Stateless between
/// requests: every inbox load opens and closes its own connection.
#[derive(Debug, Clone)]
pub struct MailService {
    imap: ImapConfig,
    smtp: SmtpConfig,
}

impl MailService {
    pub fn new(imap: ImapConfig, smtp: SmtpConfig) -> Self {
        Self { imap, smtp }
    }

    /// Fetch and normalize the whole inbox, unread first. Bounded by the
    /// configured connection timeout; per-message failures never fail the
    /// batch.
    pub async fn fetch_inbox(&self) -> Result<Vec<NormalizedMessage>, MailError> {
        let config = self.imap.clone();
        let timeout_secs = config.timeout_secs;
        let fetch = task::spawn_blocking(move || inbox::fetch_transcript(&config));

        let raw = match tokio::time::timeout(Duration::from_secs(timeout_secs), fetch).await {
            Ok(joined) => {
                joined.map_err(|err| MailError::Data(format!("inbox fetch task failed: {err}")))??
            }
            Err(_) => return Err(MailError::Timeout(timeout_secs)),
        };

        tracing::info!(total = raw.len(), "fetched inbox transcript");
        Ok(normalize::normalize_batch(&raw))
    }

    /// Verify the SMTP connection and deliver one composed message.
    pub async fn send(&self, outgoing: &OutgoingMail, html_body: &str) -> Result<(), MailError> {
        outbound::send_mail(&self.smtp, outgoing, html_body).await
    }

    pub fn from_name(&self) -> &str {
        &self.smtp.from_name
    }
}
