//! Report delivery to an external recipient

use crate::engine::ReconciliationResult;
use crate::error::{ReconError, Result};
use crate::report::{section_views, RenderedReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::{Context, Tera};

const NOTIFICATION_TEMPLATE: &str = include_str!("templates/notification.html");

/// Rows per section shown in the message body; the attachment has everything
const BODY_ROW_LIMIT: usize = 50;

/// Delivery settings, passed in explicitly rather than read from the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub sender: String,
    pub subject: String,
    /// Transport endpoint, e.g. a mail API URL
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sender: "reconciliation@reconcyl.ng".to_string(),
            subject: "Reconciliation Report Completed".to_string(),
            endpoint: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// A fully composed outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Attachment,
}

/// Delivers composed messages. Implementations own authentication and retries.
pub trait Transport: Send + Sync {
    fn send(&self, config: &NotificationConfig, message: &Message) -> Result<()>;
}

/// Transport that only records the delivery in the log
#[derive(Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&self, config: &NotificationConfig, message: &Message) -> Result<()> {
        log::info!(
            "Delivering '{}' to {} via {} ({} attached, {} bytes)",
            message.subject,
            message.to,
            config.endpoint.as_deref().unwrap_or("log"),
            message.attachment.filename,
            message.attachment.content.len()
        );
        Ok(())
    }
}

/// Sends rendered reports through a transport
pub struct NotificationDispatcher {
    config: NotificationConfig,
    transport: Arc<dyn Transport>,
    templates: Tera,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut templates = Tera::default();
        templates.add_raw_template("notification.html", NOTIFICATION_TEMPLATE)?;
        Ok(Self {
            config,
            transport,
            templates,
        })
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    /// Compose and send the report to `recipient`
    pub fn dispatch(
        &self,
        recipient: &str,
        result: &ReconciliationResult,
        report: &RenderedReport,
    ) -> Result<()> {
        validate_recipient(recipient).map_err(|e| ReconError::notification(e.to_string()))?;
        let message = self.compose(recipient, result, report)?;
        self.transport
            .send(&self.config, &message)
            .map_err(|e| match e {
                ReconError::Notification { .. } => e,
                other => ReconError::notification(other.to_string()),
            })
    }

    fn compose(
        &self,
        recipient: &str,
        result: &ReconciliationResult,
        report: &RenderedReport,
    ) -> Result<Message> {
        let mut context = Context::new();
        context.insert("recipient", recipient);
        context.insert("subject", &self.config.subject);
        context.insert("filename", &report.filename);
        context.insert("sections", &section_views(result, Some(BODY_ROW_LIMIT)));

        let html_body = self
            .templates
            .render("notification.html", &context)
            .map_err(|e| ReconError::notification(format!("failed to render message body: {}", e)))?;

        Ok(Message {
            from: self.config.sender.clone(),
            to: recipient.to_string(),
            subject: self.config.subject.clone(),
            html_body,
            attachment: Attachment {
                filename: report.filename.clone(),
                mime_type: report.mime_type.clone(),
                content: report.content.clone(),
            },
        })
    }
}

/// Minimal shape check on an email address
pub fn validate_recipient(recipient: &str) -> Result<()> {
    let valid = match recipient.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !recipient.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ReconError::invalid_input(format!(
            "'{}' is not a valid recipient address",
            recipient
        )))
    }
}
