use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

/// Reads a JSON body, turning non-2xx statuses into `BackendError` with the
/// upstream text attached.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
    service: &str,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!("{} returned error {}: {}", service, status, error_text);
        return Err(AppError::BackendError(format!(
            "{} returned status {}",
            service, status
        )));
    }

    response.json().await.map_err(|e| {
        AppError::TransportError(format!("Failed to parse {} response: {}", service, e))
    })
}

/// Client for the remote credit-prequalification backend.
#[derive(Clone)]
pub struct CreditBackendService {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl CreditBackendService {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.prequal_api_url.clone(),
            api_token: config.prequal_api_token.clone(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// Fetches the dealer record for a widget id.
    ///
    /// The backend's envelope is returned as-is; a non-zero `error` is for the
    /// caller to interpret.
    pub async fn fetch_dealer(
        &self,
        request: &DataRequest,
    ) -> Result<BackendEnvelope<DealerItems>, AppError> {
        let url = format!("{}/dealer", self.base_url);
        tracing::info!("Fetching dealer data for widget {}", request.id);

        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Dealer request failed: {}", e)))?;

        let envelope: BackendEnvelope<DealerItems> = read_json(response, "Prequal API").await?;
        if !envelope.is_ok() {
            tracing::warn!(
                "⚠️  Dealer lookup for {} returned error {}: {}",
                request.id,
                envelope.error,
                envelope.msg.as_deref().unwrap_or("no message")
            );
        }
        Ok(envelope)
    }

    /// Forwards a verified application. Fails with the backend's own message
    /// when it declines.
    pub async fn submit_application(&self, payload: &SubmissionPayload) -> Result<(), AppError> {
        let url = format!("{}/application", self.base_url);
        tracing::info!("Forwarding application for dealer {}", payload.dealer_id);

        let response = self
            .authorized(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                AppError::TransportError(format!("Application request failed: {}", e))
            })?;

        let envelope: BackendEnvelope<Value> = read_json(response, "Prequal API").await?;
        if envelope.is_ok() {
            tracing::info!("✓ Application accepted by prequal backend");
            Ok(())
        } else {
            Err(AppError::BackendError(envelope.msg.unwrap_or_else(|| {
                format!("Application rejected (code {})", envelope.error)
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZipDatasetResponse {
    #[serde(default)]
    items: Vec<ZipCandidate>,
}

/// Client for the static zip-code dataset service.
#[derive(Clone)]
pub struct ZipDatasetService {
    client: Client,
    base_url: String,
}

impl ZipDatasetService {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.zip_api_url.clone(),
        }
    }

    pub async fn lookup(&self, id: &str, zip: &str) -> Result<Vec<ZipCandidate>, AppError> {
        // Build URL with proper encoding; the zip is user input
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid zip API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError("Zip API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("zip")
            .push(zip);
        url.query_pairs_mut().append_pair("id", id);

        tracing::debug!("Zip dataset lookup: {}", zip);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Zip lookup failed: {}", e)))?;

        // 404 means the dataset has no entry for this zip
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }

        let result: ZipDatasetResponse = read_json(response, "Zip dataset").await?;
        Ok(result.items)
    }
}
