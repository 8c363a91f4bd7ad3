use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::SubmissionPayload;
use crate::templates::{
    render, submission_vars, TemplateStore, ADF_TEMPLATE, CONTACT_TEMPLATE,
};

const CONTACT_SUBJECT: &str = "New Prequalification Request: {{FIRST_NAME}} {{LAST_NAME}}";
const ADF_SUBJECT: &str = "Prequalification Lead - {{DEALER_NAME}}";

/// One outgoing email in the delivery service's batch format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    pub tag: String,
}

/// Per-message result reported by the delivery service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeliveryReceipt {
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, rename = "MessageID")]
    pub message_id: Option<String>,
}

/// Transactional email collaborator. One call per batch.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_batch(&self, messages: &[EmailMessage]) -> Result<Vec<DeliveryReceipt>, AppError>;
}

/// Postmark-compatible batch transport.
#[derive(Clone)]
pub struct PostmarkTransport {
    client: Client,
    base_url: String,
    token: String,
}

impl PostmarkTransport {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.postmark_api_url.clone(),
            token: config.postmark_token.clone(),
        }
    }
}

#[async_trait]
impl EmailTransport for PostmarkTransport {
    async fn send_batch(&self, messages: &[EmailMessage]) -> Result<Vec<DeliveryReceipt>, AppError> {
        let url = format!("{}/email/batch", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-Postmark-Server-Token", &self.token)
            .header("Accept", "application/json")
            .json(messages)
            .send()
            .await
            .map_err(|e| AppError::DispatchError(format!("Email batch request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::DispatchError(format!(
                "Email service returned {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            AppError::DispatchError(format!("Failed to parse email service response: {}", e))
        })
    }
}

/// Renders every notification for one submission.
///
/// The HTML contact notification goes to the dealer's contact address only when
/// one is set. The ADF lead goes to the primary ADF inbox and every additional
/// one. Both are copied to `oversight` as separate messages.
pub fn build_batch(
    payload: &SubmissionPayload,
    templates: &TemplateStore,
    from: &str,
    oversight: &str,
    requested_at: DateTime<Utc>,
) -> Result<Vec<EmailMessage>, AppError> {
    let vars = submission_vars(payload, requested_at);
    let mut batch = Vec::new();

    if let Some(contact) = payload.contact_address() {
        let html = templates.render_notification(CONTACT_TEMPLATE, &vars)?;
        let subject = render(CONTACT_SUBJECT, &vars);
        for to in [contact, oversight] {
            batch.push(EmailMessage {
                from: from.to_string(),
                to: to.to_string(),
                subject: subject.clone(),
                html_body: Some(html.clone()),
                text_body: None,
                tag: "contact".to_string(),
            });
        }
    }

    let adf = templates.render_notification(ADF_TEMPLATE, &vars)?;
    let subject = render(ADF_SUBJECT, &vars);
    let mut recipients = vec![payload.adf_email.trim().to_string()];
    recipients.extend(payload.additional_adf_list());
    recipients.push(oversight.to_string());

    for to in recipients.into_iter().filter(|r| !r.is_empty()) {
        batch.push(EmailMessage {
            from: from.to_string(),
            to,
            subject: subject.clone(),
            html_body: None,
            text_body: Some(adf.clone()),
            tag: "adf-lead".to_string(),
        });
    }

    Ok(batch)
}

/// Sends a submission's notifications as one atomic batch.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn EmailTransport>,
    from: String,
    oversight: String,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn EmailTransport>, from: String, oversight: String) -> Self {
        Self {
            transport,
            from,
            oversight,
        }
    }

    /// Returns the number of messages accepted. Any rejected message fails the
    /// whole dispatch; nothing is retried.
    pub async fn dispatch(
        &self,
        payload: &SubmissionPayload,
        templates: &TemplateStore,
    ) -> Result<usize, AppError> {
        let batch = build_batch(payload, templates, &self.from, &self.oversight, Utc::now())?;
        let receipts = self.transport.send_batch(&batch).await?;

        let failed: Vec<String> = receipts
            .iter()
            .filter(|r| r.error_code != 0)
            .map(|r| {
                format!(
                    "{} ({}: {})",
                    r.to.as_deref().unwrap_or("unknown recipient"),
                    r.error_code,
                    r.message
                )
            })
            .collect();

        if !failed.is_empty() {
            tracing::error!(
                "❌ {} of {} notification(s) rejected: {}",
                failed.len(),
                batch.len(),
                failed.join("; ")
            );
            return Err(AppError::DispatchError(format!(
                "{} of {} messages rejected",
                failed.len(),
                batch.len()
            )));
        }

        if receipts.len() != batch.len() {
            return Err(AppError::DispatchError(format!(
                "Email service acknowledged {} of {} messages",
                receipts.len(),
                batch.len()
            )));
        }

        tracing::info!("✓ Dispatched {} notification(s)", batch.len());
        Ok(batch.len())
    }
}
