//! Outbound email.
//!
//! Every delivery attempt made through [`send_logged`] leaves a row in
//! `email_logs`, successful or not.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::{EmailLogEntry, EmailStatus};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Sends through the Microsoft Graph `sendMail` endpoint.
pub struct GraphMailer {
    client: reqwest::Client,
    url: String,
    access_token: String,
}

impl GraphMailer {
    pub fn new(url: impl Into<String>, access_token: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl Mailer for GraphMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let payload = json!({
            "message": {
                "subject": message.subject,
                "body": { "contentType": "HTML", "content": message.html_body },
                "toRecipients": [{ "emailAddress": { "address": message.to } }],
            },
            "saveToSentItems": false,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Development transport: writes the message to the log and reports success.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email not delivered (log transport):\n{}",
            message.html_body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory. Used by tests.
#[derive(Clone, Default)]
pub struct OutboxMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Graph transport when an access token is configured, log transport otherwise.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.email.access_token.as_deref() {
        Some(token) => Ok(Arc::new(GraphMailer::new(config.graph_send_url(), token)?)),
        None => {
            warn!("GRAPH_ACCESS_TOKEN not set; emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Sends a message and records the outcome in `email_logs`.
pub async fn send_logged(
    store: &dyn Store,
    mailer: &dyn Mailer,
    message: &EmailMessage,
) -> Result<(), MailError> {
    let result = mailer.send(message).await;

    let (status, error) = match &result {
        Ok(()) => (EmailStatus::Sent, None),
        Err(e) => (EmailStatus::Failed, Some(e.to_string())),
    };
    let entry = EmailLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        to: message.to.clone(),
        subject: message.subject.clone(),
        status,
        error,
        timestamp: Utc::now(),
    };
    if let Err(e) = store.append_email_log(&entry).await {
        warn!("Failed to write email log for {}: {}", message.to, e);
    }

    result
}
