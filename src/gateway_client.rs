use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::*;
use crate::orchestrator::SubmissionBackend;
use crate::session::DealerSource;
use crate::zip_resolution::ZipLookup;

/// Widget-side client for the widget API server.
///
/// One instance backs all three collaborator seams of a session: the dealer
/// fetch, zip lookups and submissions.
#[derive(Clone)]
pub struct WidgetApiClient {
    client: Client,
    origin: String,
}

impl WidgetApiClient {
    /// Creates a client for the server at `origin` (scheme + host, optional
    /// path prefix).
    pub fn new(client: Client, origin: impl Into<String>) -> Self {
        Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Response, AppError> {
        let url = format!("{}{}", self.origin, path);
        tracing::debug!("POST {}", url);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("{} request failed: {}", path, e)))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, AppError> {
        let response = self.post(path, body).await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!("⚠️  {} returned {}: {}", path, status, error_text);
            // the server's own `{success: false, message}` is the only text
            // worth passing on; anything else stays in the log
            return Err(match serde_json::from_str::<SubmitResponse>(&error_text) {
                Ok(SubmitResponse {
                    message: Some(message),
                    ..
                }) if !message.trim().is_empty() => AppError::BackendError(message),
                _ => AppError::TransportError(format!("{} returned {}", path, status)),
            });
        }

        response.json().await.map_err(|e| {
            AppError::TransportError(format!("Failed to parse {} response: {}", path, e))
        })
    }

    /// Fetches a rendered static page (privacy policy, terms) for the dealer.
    pub async fn fetch_page(&self, page: &str, dealer: &DealerContext) -> Result<String, AppError> {
        let body = PageRequest {
            page: page.to_string(),
            name: dealer.name.clone(),
            phone: dealer.phone.clone(),
            email: dealer.adf_email.clone(),
        };
        let response = self.post("/api/page", &body).await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::TemplateMissing(page.to_string()));
        }
        if !status.is_success() {
            return Err(AppError::BackendError(format!(
                "/api/page returned {}",
                status
            )));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DealerSource for WidgetApiClient {
    /// Only a dealer record the server actually answered with counts; any
    /// non-2xx answer reads as "not found".
    async fn fetch_dealer(&self, request: &DataRequest) -> Result<DealerContext, AppError> {
        let response: DataResponse = self
            .post_json("/api/data", request)
            .await
            .map_err(|e| AppError::NotFound(format!("Dealer {} unavailable: {}", request.id, e)))?;
        let envelope = response.data;

        if !response.success || !envelope.is_ok() {
            return Err(AppError::BackendError(envelope.msg.unwrap_or_else(|| {
                format!("Dealer lookup failed (code {})", envelope.error)
            })));
        }

        envelope
            .items
            .map(|items| items.into_context(&request.id))
            .ok_or_else(|| AppError::NotFound(format!("No dealer record for {}", request.id)))
    }
}

#[async_trait]
impl ZipLookup for WidgetApiClient {
    async fn lookup_zip(&self, session_id: &str, zip: &str) -> Result<Vec<ZipCandidate>, AppError> {
        let request = ZipRequest {
            id: session_id.to_string(),
            zip: zip.to_string(),
        };
        let response: ZipResponse = self.post_json("/api/zipcode", &request).await?;

        if !response.success {
            return Err(AppError::BackendError(
                response
                    .msg
                    .unwrap_or_else(|| "Zip lookup failed".to_string()),
            ));
        }
        Ok(response.content.items)
    }
}

#[async_trait]
impl SubmissionBackend for WidgetApiClient {
    /// Error statuses still carry `{success: false, message}`; that body is
    /// returned as-is so the backend's message reaches the applicant.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, AppError> {
        let response = self.post("/api/submit", payload).await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(parsed) => {
                if !status.is_success() {
                    tracing::warn!("⚠️  /api/submit returned {}", status);
                }
                Ok(parsed)
            }
            Err(e) => Err(AppError::TransportError(format!(
                "Unexpected /api/submit response ({}): {}",
                status, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_trailing_slash_is_trimmed() {
        let client = WidgetApiClient::new(Client::new(), "https://widget.example/");
        assert_eq!(client.origin, "https://widget.example");
    }
}
