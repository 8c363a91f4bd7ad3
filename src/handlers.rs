use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::gating::{RecaptchaVerifier, SUBMIT_ACTION};
use crate::models::*;
use crate::notification::{NotificationDispatcher, PostmarkTransport};
use crate::obs::fingerprint;
use crate::services::{CreditBackendService, ZipDatasetService};
use crate::templates::{page_vars, TemplateStore};
use crate::theme::WidgetOptions;
use crate::validation::{validate_applicant, validate_email, validate_zip};
use crate::zip_resolution::lookup_key;
use axum::{
    extract::{rejection::JsonRejection, RawQuery, State},
    http::StatusCode,
    response::Html,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Remote credit-prequalification backend.
    pub credit_backend: CreditBackendService,
    /// Static zip-code dataset.
    pub zip_service: ZipDatasetService,
    /// CAPTCHA score verification.
    pub recaptcha: RecaptchaVerifier,
    /// Notification templates and static pages.
    pub templates: Arc<TemplateStore>,
    /// Email batch dispatcher.
    pub dispatcher: NotificationDispatcher,
    /// Zip → candidates (1 hour TTL). The dataset is static, so entries only
    /// expire to bound memory.
    pub zip_cache: Cache<String, Vec<ZipCandidate>>,
}

impl AppState {
    /// Wires every collaborator from configuration. One HTTP client is shared.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rust-prequal-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let templates = match &config.template_dir {
            Some(dir) => TemplateStore::load(dir)?,
            None => TemplateStore::builtin(),
        };

        let transport = Arc::new(PostmarkTransport::new(client.clone(), &config));
        let dispatcher = NotificationDispatcher::new(
            transport,
            config.email_from.clone(),
            config.oversight_email.clone(),
        );

        let zip_cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(50_000)
            .build();

        Ok(Self {
            credit_backend: CreditBackendService::new(client.clone(), &config),
            zip_service: ZipDatasetService::new(client.clone(), &config),
            recaptcha: RecaptchaVerifier::new(client, &config),
            templates: Arc::new(templates),
            dispatcher,
            zip_cache,
            config,
        })
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-prequal-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/data
///
/// Initial dealer fetch for a widget id. The backend envelope is passed through
/// under `data`; `data.error != 0` tells the widget to show its not-found view.
pub async fn fetch_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DataRequest>, JsonRejection>,
) -> Result<Json<DataResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    if request.id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing widget id".to_string()));
    }

    tracing::info!(
        "POST /api/data - id={}, deploy_type={:?}, parent_domain={:?}",
        request.id,
        request.deploy_type,
        request.parent_domain
    );

    let data = state
        .credit_backend
        .fetch_dealer(&request)
        .await
        .context("fetching dealer data")?;

    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

/// POST /api/zipcode
pub async fn zipcode(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ZipRequest>, JsonRejection>,
) -> Result<Json<ZipResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let zip = validate_zip(&request.zip).map_err(AppError::BadRequest)?;
    let key = lookup_key(&zip).to_string();

    let items = match state.zip_cache.get(&key).await {
        Some(cached) => {
            tracing::debug!("Zip cache HIT: {}", key);
            cached
        }
        None => {
            tracing::debug!("Zip cache MISS: {}", key);
            let items = state
                .zip_service
                .lookup(&request.id, &key)
                .await
                .context("looking up zip code")?;
            state.zip_cache.insert(key.clone(), items.clone()).await;
            items
        }
    };

    let msg = items
        .is_empty()
        .then(|| format!("No matches found for zip code {}", key));

    Ok(Json(ZipResponse {
        success: true,
        content: ZipContent { items },
        msg,
    }))
}

/// POST /api/page
///
/// Renders a named static page (privacy policy, terms) for the dealer.
pub async fn page(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PageRequest>, JsonRejection>,
) -> Result<Html<String>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    tracing::info!("POST /api/page - page={}", request.page);

    let vars = page_vars(&request.name, &request.phone, &request.email, Utc::now());
    let html = state.templates.render_page(&request.page, &vars)?;
    Ok(Html(html))
}

/// GET /api/theme
///
/// Echoes the normalized widget options for a query string plus the CSS
/// custom properties they produce.
pub async fn theme(RawQuery(query): RawQuery) -> Json<serde_json::Value> {
    let options = WidgetOptions::from_query(query.as_deref().unwrap_or_default());
    let stylesheet = options.stylesheet();
    Json(json!({
        "options": options,
        "stylesheet": stylesheet,
    }))
}

/// POST /api/submit
///
/// Flow:
/// 1. Parse and re-validate the applicant (the widget already did, but the
///    body is untrusted).
/// 2. Verify the CAPTCHA token and score.
/// 3. Forward the application to the credit backend.
/// 4. Render and dispatch the notification batch.
///
/// Any failure answers `{"success": false, "message": ...}`.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmissionPayload>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::warn!("Malformed submission body: {}", e.body_text());
        AppError::BadRequest("Malformed submission".to_string())
    })?;

    // Correlates the backend call and the email batch in the logs
    let submission_id = Uuid::new_v4();
    tracing::info!(
        "📨 Submission {} for dealer {} from applicant {}",
        submission_id,
        payload.dealer_id,
        fingerprint(&payload.email)
    );

    // Step 1: validation
    let applicant = validate_applicant(&payload.applicant_form()).map_err(AppError::Validation)?;
    let dealer = payload.dealer_context();
    validate_email(&dealer.adf_email).map_err(|_| {
        AppError::BadRequest("Dealer notification address is missing".to_string())
    })?;
    let normalized = SubmissionPayload::build(&applicant, &dealer, &payload.recaptcha);

    // Step 2: bot gating
    state
        .recaptcha
        .verify(&normalized.recaptcha, SUBMIT_ACTION)
        .await?;

    // Step 3: credit backend
    state
        .credit_backend
        .submit_application(&normalized)
        .await
        .with_context(|| format!("forwarding application {}", submission_id))?;

    // Step 4: notifications
    let sent = state
        .dispatcher
        .dispatch(&normalized, &state.templates)
        .await
        .with_context(|| format!("dispatching notifications for {}", submission_id))?;

    tracing::info!(
        "✅ Submission {} complete for dealer {} ({} notification(s))",
        submission_id,
        normalized.dealer_id,
        sent
    );

    Ok(Json(SubmitResponse {
        success: true,
        message: Some("Application submitted".to_string()),
    }))
}
