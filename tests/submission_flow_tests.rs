/// End-to-end widget flows with in-process collaborators
/// Covers zip resolution, gating, submission outcomes and notification fan-out
use async_trait::async_trait;
use chrono::Utc;
use rust_prequal_api::errors::AppError;
use rust_prequal_api::gating::{GatingToken, TokenProvider};
use rust_prequal_api::host::{ChannelNotifier, HostMessage};
use rust_prequal_api::models::*;
use rust_prequal_api::notification::build_batch;
use rust_prequal_api::orchestrator::{SubmissionBackend, SubmissionOrchestrator, SubmitOutcome};
use rust_prequal_api::session::{
    Notice, SuccessView, UiState, WidgetSession, ZIP_SELECTION_MESSAGE,
};
use rust_prequal_api::templates::TemplateStore;
use rust_prequal_api::theme::WidgetOptions;
use rust_prequal_api::validation::{validate_applicant, Field};
use rust_prequal_api::zip_resolution::ZipLookup;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

struct ZipTable(HashMap<&'static str, Vec<ZipCandidate>>);

impl ZipTable {
    fn standard() -> Self {
        let candidate = |city: &str, state: &str| ZipCandidate {
            city: city.to_string(),
            county: String::new(),
            state: state.to_string(),
        };
        Self(HashMap::from([
            ("00000", vec![]),
            ("78701", vec![candidate("Austin", "TX")]),
            (
                "10001",
                vec![candidate("New York", "NY"), candidate("Manhattan", "NY")],
            ),
        ]))
    }
}

#[async_trait]
impl ZipLookup for ZipTable {
    async fn lookup_zip(&self, _session_id: &str, zip: &str) -> Result<Vec<ZipCandidate>, AppError> {
        Ok(self.0.get(zip).cloned().unwrap_or_default())
    }
}

struct Gate {
    ready: bool,
    requests: AtomicUsize,
}

#[async_trait]
impl TokenProvider for Gate {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn obtain_token(&self, action: &str) -> Result<GatingToken, AppError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(GatingToken::new(format!("{}-token", action)))
    }
}

struct Backend {
    reply: Result<SubmitResponse, AppError>,
    calls: Mutex<Vec<SubmissionPayload>>,
}

#[async_trait]
impl SubmissionBackend for Backend {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, AppError> {
        self.calls.lock().unwrap().push(payload.clone());
        self.reply.clone()
    }
}

struct Harness {
    orchestrator: SubmissionOrchestrator,
    gate: Arc<Gate>,
    backend: Arc<Backend>,
    host: UnboundedReceiver<String>,
}

fn harness(ready: bool, reply: Result<SubmitResponse, AppError>) -> Harness {
    let gate = Arc::new(Gate {
        ready,
        requests: AtomicUsize::new(0),
    });
    let backend = Arc::new(Backend {
        reply,
        calls: Mutex::new(vec![]),
    });
    let (notifier, host) = ChannelNotifier::new();
    Harness {
        orchestrator: SubmissionOrchestrator::new(gate.clone(), backend.clone(), Arc::new(notifier)),
        gate,
        backend,
        host,
    }
}

fn dealer() -> DealerContext {
    DealerContext {
        id: "dealer-42".to_string(),
        name: "Main Street Motors".to_string(),
        phone: "5125550199".to_string(),
        adf_email: "c@z.com".to_string(),
        additional_adf_emails: vec!["a@x.com".to_string(), "b@y.com".to_string()],
        contact_email: None,
    }
}

fn filled_session(options: WidgetOptions) -> WidgetSession {
    let mut session = WidgetSession::with_dealer(options, dealer());
    for (field, value) in [
        (Field::FirstName, "Jane"),
        (Field::LastName, "Doe"),
        (Field::Address, "100 Congress Ave"),
        (Field::Zip, "78701"),
        (Field::City, "Austin"),
        (Field::State, "TX"),
        (Field::MobilePhone, "(512) 555-0100"),
        (Field::Email, "jane@example.com"),
    ] {
        session.set_field(field, value);
    }
    session.set_consent(true);
    session
}

fn declined() -> Result<SubmitResponse, AppError> {
    Ok(SubmitResponse {
        success: false,
        message: Some("Declined".to_string()),
    })
}

fn accepted() -> Result<SubmitResponse, AppError> {
    Ok(SubmitResponse {
        success: true,
        message: None,
    })
}

#[tokio::test]
async fn test_zip_with_no_matches_clears_location() {
    let zips = ZipTable::standard();
    let mut session = filled_session(WidgetOptions::default());

    session.update_zip("00000", &zips).await;

    assert!(session.form().city.is_empty());
    assert!(session.form().state.is_empty());
    assert!(matches!(session.notice(), Some(Notice::Warning(_))));
    assert_eq!(session.ui_state(), UiState::Idle);
}

#[tokio::test]
async fn test_zip_with_single_match_fills_without_prompt() {
    let zips = ZipTable::standard();
    let mut session = WidgetSession::with_dealer(WidgetOptions::default(), dealer());

    session.update_zip("78701", &zips).await;

    assert_eq!(session.form().city, "Austin");
    assert_eq!(session.form().state, "TX");
    assert!(session.zip_prompt().is_none());
}

#[tokio::test]
async fn test_zip_with_two_matches_applies_selected_candidate() {
    let zips = ZipTable::standard();
    let mut session = WidgetSession::with_dealer(WidgetOptions::default(), dealer());

    session.update_zip("10001", &zips).await;
    assert_eq!(session.zip_prompt().unwrap().candidates.len(), 2);
    assert!(session.form().city.is_empty());

    let chosen = session.select_zip_candidate(1).unwrap();
    assert_eq!(chosen.city, "Manhattan");
    assert_eq!(session.form().city, "Manhattan");
    assert_eq!(session.form().state, "NY");
    assert!(session.zip_prompt().is_none());
}

#[tokio::test]
async fn test_missing_required_field_never_requests_token() {
    let h = harness(true, accepted());
    let mut session = filled_session(WidgetOptions::default());
    session.set_field(Field::Address, "   ");

    let outcome = h.orchestrator.submit(&mut session).await;

    assert!(matches!(outcome, SubmitOutcome::Invalid(ref e) if e.contains_key(&Field::Address)));
    assert_eq!(h.gate.requests.load(Ordering::SeqCst), 0);
    assert!(h.backend.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_consent_false_blocks_submission() {
    let h = harness(true, accepted());
    let mut session = filled_session(WidgetOptions::default());
    session.set_consent(false);

    let outcome = h.orchestrator.submit(&mut session).await;

    assert!(matches!(outcome, SubmitOutcome::Invalid(ref e) if e.contains_key(&Field::ConsentGiven)));
    assert_eq!(h.gate.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gate_not_ready_makes_no_network_call() {
    let h = harness(false, accepted());
    let mut session = filled_session(WidgetOptions::default());

    let outcome = h.orchestrator.submit(&mut session).await;

    assert!(matches!(outcome, SubmitOutcome::NotReady(_)));
    assert!(h.backend.calls.lock().unwrap().is_empty());
    assert_eq!(session.ui_state(), UiState::Idle);
}

#[tokio::test]
async fn test_declined_keeps_form_editable() {
    let h = harness(true, declined());
    let mut session = filled_session(WidgetOptions::default());
    let before = session.form().clone();

    let outcome = h.orchestrator.submit(&mut session).await;

    assert_eq!(outcome, SubmitOutcome::Failed("Declined".to_string()));
    assert_eq!(session.ui_state(), UiState::Idle);
    assert!(session.can_submit());
    assert_eq!(session.notice().map(|n| n.message()), Some("Declined"));
    assert_eq!(session.form(), &before);

    // retry is allowed straight away
    let retry = h.orchestrator.submit(&mut session).await;
    assert_eq!(retry, SubmitOutcome::Failed("Declined".to_string()));
    assert_eq!(h.backend.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_success_clears_form_once_and_signals_host() {
    let mut h = harness(true, accepted());
    let mut session = filled_session(WidgetOptions::default());

    let outcome = h.orchestrator.submit(&mut session).await;
    assert_eq!(outcome, SubmitOutcome::Succeeded);
    assert!(session.form().is_empty());
    assert_eq!(session.ui_state(), UiState::SuccessDisplayed);
    assert_eq!(session.success_view(), SuccessView::Standard);

    let second = h.orchestrator.submit(&mut session).await;
    assert_eq!(second, SubmitOutcome::Ignored);
    assert_eq!(h.backend.calls.lock().unwrap().len(), 1);

    let message = h.host.try_recv().unwrap();
    assert_eq!(HostMessage::parse(&message), Some(HostMessage::Submitted));
    assert!(h.host.try_recv().is_err());

    let payload = h.backend.calls.lock().unwrap()[0].clone();
    assert_eq!(payload.recaptcha, "submit-token");
    assert_eq!(payload.mobile_phone, "5125550100");
    assert_eq!(payload.additional_adf_emails, "a@x.com,b@y.com");
}

#[tokio::test]
async fn test_themed_success_page() {
    let mut h = harness(true, accepted());
    let options = WidgetOptions::from_query(
        "successPageEnabled=true&successLogo=https%3A%2F%2Fcdn.example%2Flogo.png\
         &dealerLoc=Austin%2C%20TX&btnType=styled&bgColor=rgba(0,0,0,1)",
    );
    let mut session = filled_session(options);

    h.orchestrator.submit(&mut session).await;

    assert_eq!(
        session.success_view(),
        SuccessView::Themed {
            logo_url: "https://cdn.example/logo.png".to_string(),
            dealer_name: "Main Street Motors".to_string(),
            dealer_phone: "512-555-0199".to_string(),
            location: Some("Austin, TX".to_string()),
        }
    );

    assert_eq!(h.host.try_recv().unwrap(), "submitted::");
}

#[tokio::test]
async fn test_open_zip_selection_holds_submission() {
    let h = harness(true, accepted());
    let zips = ZipTable::standard();
    let mut session = filled_session(WidgetOptions::default());

    session.update_zip("10001", &zips).await;
    assert!(session.zip_prompt().is_some());

    let outcome = h.orchestrator.submit(&mut session).await;

    assert_eq!(
        outcome,
        SubmitOutcome::NotReady(ZIP_SELECTION_MESSAGE.to_string())
    );
    assert_eq!(h.gate.requests.load(Ordering::SeqCst), 0);
    assert!(h.backend.calls.lock().unwrap().is_empty());
    assert_eq!(session.form().city, "Austin");
    assert_eq!(session.ui_state(), UiState::Idle);

    // choosing a city releases the hold
    session.select_zip_candidate(0).unwrap();
    assert_eq!(h.orchestrator.submit(&mut session).await, SubmitOutcome::Succeeded);
    assert_eq!(h.backend.calls.lock().unwrap()[0].city, "New York");
}

#[tokio::test]
async fn test_layout_and_inventory_signals_reach_host() {
    let (notifier, mut host) = ChannelNotifier::new();
    let options = WidgetOptions::from_query(
        "successPageEnabled=true&successLogo=https%3A%2F%2Fcdn.example%2Flogo.png",
    );
    let mut session = filled_session(options);

    session.report_height(720, &notifier);
    assert!(session.view_inventory(&notifier).is_err());

    let h = harness(true, accepted());
    h.orchestrator.submit(&mut session).await;
    session.report_height(360, &notifier);
    session.view_inventory(&notifier).unwrap();

    let sent: Vec<HostMessage> = std::iter::from_fn(|| host.try_recv().ok())
        .filter_map(|m| HostMessage::parse(&m))
        .collect();
    assert_eq!(
        sent,
        vec![
            HostMessage::Resize(720),
            HostMessage::Resize(360),
            HostMessage::ViewInventory,
        ]
    );
}

#[test]
fn test_adf_fan_out_is_four_text_messages() {
    let form = RawApplicantForm {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        address: "100 Congress Ave".to_string(),
        zip: "78701".to_string(),
        city: "Austin".to_string(),
        state: "TX".to_string(),
        mobile_phone: "5125550100".to_string(),
        email: "jane@example.com".to_string(),
        consent_given: true,
        ..Default::default()
    };
    let applicant = validate_applicant(&form).unwrap();
    let payload = SubmissionPayload::build(&applicant, &dealer(), "tok");

    let batch = build_batch(
        &payload,
        &TemplateStore::builtin(),
        "leads@widget.example",
        "oversight@widget.example",
        Utc::now(),
    )
    .unwrap();

    let text: Vec<&str> = batch
        .iter()
        .filter(|m| m.text_body.is_some())
        .map(|m| m.to.as_str())
        .collect();
    assert_eq!(
        text,
        vec!["c@z.com", "a@x.com", "b@y.com", "oversight@widget.example"]
    );
    assert!(batch.iter().all(|m| m.html_body.is_none()));
}
