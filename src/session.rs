//! Per-page-load session context.
//!
//! Replaces a global client store: the session is one explicit object, passed
//! by `&mut` to whichever step is running, so there is exactly one writer at a
//! time. Nothing here is persisted.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::host::{HostMessage, HostNotifier};
use crate::models::{DataRequest, DealerContext, RawApplicantForm, ZipCandidate};
use crate::theme::WidgetOptions;
use crate::validation::{format_phone, validate_field, validate_zip, Field, FieldErrors};
use crate::zip_resolution::{resolve_zip, should_auto_decode, ZipLookup, ZipPrompt, ZipResolution};

/// Shown in place of the form when the dealer record cannot be loaded.
pub const DEALER_NOT_FOUND_MESSAGE: &str = "This form is not available.";

/// Submit is held while the applicant still has to pick a city for the zip.
pub const ZIP_SELECTION_MESSAGE: &str = "Please choose your city for this zip code.";

/// Source of the session's dealer record (the initial data fetch).
#[async_trait]
pub trait DealerSource: Send + Sync {
    async fn fetch_dealer(&self, request: &DataRequest) -> Result<DealerContext, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DealerStatus {
    Loading,
    Ready(DealerContext),
    NotFound(String),
}

/// Submission attempt lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    TokenPending,
    Submitting,
    Succeeded,
    Failed(String),
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionState::TokenPending | SubmissionState::Submitting)
    }
}

/// What the widget renders, derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    Loading,
    Submitting,
    SuccessDisplayed,
    ErrorDisplayed,
}

/// Non-blocking toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Warning(m) | Notice::Error(m) => m,
        }
    }
}

/// Which success view to hand off to.
///
/// The themed page needs both `successPageEnabled` and a logo; it shows the
/// dealer's name and phone and carries the "view inventory" button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessView {
    Standard,
    Themed {
        logo_url: String,
        dealer_name: String,
        dealer_phone: String,
        location: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct WidgetSession {
    options: WidgetOptions,
    dealer: DealerStatus,
    form: RawApplicantForm,
    field_errors: FieldErrors,
    submission: SubmissionState,
    history: Vec<SubmissionState>,
    zip_prompt: Option<ZipPrompt>,
    notice: Option<Notice>,
    reported_height: Option<u32>,
}

impl WidgetSession {
    pub fn new(options: WidgetOptions) -> Self {
        Self {
            options,
            dealer: DealerStatus::Loading,
            form: RawApplicantForm::default(),
            field_errors: FieldErrors::new(),
            submission: SubmissionState::Idle,
            history: vec![SubmissionState::Idle],
            zip_prompt: None,
            notice: None,
            reported_height: None,
        }
    }

    /// Session that starts with an already-fetched dealer record.
    pub fn with_dealer(options: WidgetOptions, dealer: DealerContext) -> Self {
        let mut session = Self::new(options);
        session.dealer = DealerStatus::Ready(dealer);
        session
    }

    /// Performs the one-time dealer fetch. A failure switches the widget to the
    /// not-found view instead of erroring out.
    pub async fn load_dealer(&mut self, source: &dyn DealerSource, request: &DataRequest) {
        if !matches!(self.dealer, DealerStatus::Loading) {
            tracing::debug!("Dealer already loaded, skipping fetch");
            return;
        }
        self.dealer = match source.fetch_dealer(request).await {
            Ok(dealer) => {
                tracing::info!("✓ Dealer context loaded: {}", dealer.name);
                DealerStatus::Ready(dealer)
            }
            Err(e) => {
                tracing::warn!("⚠️  Dealer fetch failed for {}: {}", request.id, e);
                DealerStatus::NotFound(
                    e.user_message()
                        .unwrap_or_else(|| DEALER_NOT_FOUND_MESSAGE.to_string()),
                )
            }
        };
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// Identity the zip dataset and backend key lookups by.
    pub fn session_id(&self) -> &str {
        match &self.dealer {
            DealerStatus::Ready(dealer) => &dealer.id,
            _ => self.options.dealer_id.as_deref().unwrap_or_default(),
        }
    }

    pub fn dealer_status(&self) -> &DealerStatus {
        &self.dealer
    }

    pub fn dealer(&self) -> Option<&DealerContext> {
        match &self.dealer {
            DealerStatus::Ready(dealer) => Some(dealer),
            _ => None,
        }
    }

    pub fn form(&self) -> &RawApplicantForm {
        &self.form
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn zip_prompt(&self) -> Option<&ZipPrompt> {
        self.zip_prompt.as_ref()
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// Every state the current and past attempts passed through, oldest first.
    pub fn history(&self) -> &[SubmissionState] {
        &self.history
    }

    pub fn ui_state(&self) -> UiState {
        match (&self.dealer, &self.submission) {
            (DealerStatus::Loading, _) => UiState::Loading,
            (DealerStatus::NotFound(_), _) => UiState::ErrorDisplayed,
            (_, SubmissionState::Succeeded) => UiState::SuccessDisplayed,
            (_, state) if state.is_in_flight() => UiState::Submitting,
            _ => UiState::Idle,
        }
    }

    /// The submit control is disabled while an attempt is in flight and while
    /// a zip selection is open (city/state may still be stale).
    pub fn can_submit(&self) -> bool {
        self.ui_state() == UiState::Idle && self.zip_prompt.is_none()
    }

    pub fn success_view(&self) -> SuccessView {
        let logo = match (&self.options.success_logo, self.options.success_page_enabled) {
            (Some(logo), true) => logo,
            _ => return SuccessView::Standard,
        };
        let (dealer_name, dealer_phone) = self
            .dealer()
            .map(|d| (d.name.clone(), format_phone(&d.phone)))
            .unwrap_or_default();
        SuccessView::Themed {
            logo_url: logo.clone(),
            dealer_name,
            dealer_phone,
            location: self.options.dealer_location.clone(),
        }
    }

    /// Tells the host the rendered height so it can size the iframe. Repeats
    /// of the last reported height are not sent again.
    pub fn report_height(&mut self, height: u32, host: &dyn HostNotifier) {
        if self.reported_height == Some(height) {
            return;
        }
        self.reported_height = Some(height);
        host.notify(HostMessage::Resize(height));
    }

    /// The themed success page's "view inventory" button.
    pub fn view_inventory(&self, host: &dyn HostNotifier) -> Result<(), AppError> {
        if self.ui_state() != UiState::SuccessDisplayed
            || !matches!(self.success_view(), SuccessView::Themed { .. })
        {
            return Err(AppError::BadRequest(
                "Inventory link is only shown on the themed success page".to_string(),
            ));
        }
        host.notify(HostMessage::ViewInventory);
        Ok(())
    }

    /// Writes a text field. Editing clears that field's stale error.
    pub fn set_field(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::FirstName => &mut self.form.first_name,
            Field::MiddleInitial => &mut self.form.middle_initial,
            Field::LastName => &mut self.form.last_name,
            Field::Suffix => &mut self.form.suffix,
            Field::Address => &mut self.form.address,
            Field::Zip => &mut self.form.zip,
            Field::City => &mut self.form.city,
            Field::State => &mut self.form.state,
            Field::HomePhone => &mut self.form.home_phone,
            Field::MobilePhone => &mut self.form.mobile_phone,
            Field::Email => &mut self.form.email,
            Field::ConsentGiven => {
                self.set_consent(matches!(value.trim(), "true" | "on" | "1"));
                return;
            }
        };
        *slot = value.to_string();
        self.field_errors.remove(&field);
    }

    pub fn set_consent(&mut self, given: bool) {
        self.form.consent_given = given;
        self.field_errors.remove(&Field::ConsentGiven);
    }

    /// Live validation on blur/change. Returns the field's current message.
    pub fn blur(&mut self, field: Field) -> Option<&str> {
        match validate_field(field, &self.form) {
            Some(message) => {
                self.field_errors.insert(field, message);
            }
            None => {
                self.field_errors.remove(&field);
            }
        }
        self.field_errors.get(&field).map(String::as_str)
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Edits the zip field and decodes automatically once exactly five digits
    /// are present.
    pub async fn update_zip(&mut self, value: &str, lookup: &dyn ZipLookup) {
        self.set_field(Field::Zip, value);
        if should_auto_decode(value) {
            self.decode_zip(lookup).await;
        }
    }

    /// Explicit "decode" action.
    pub async fn decode_zip(&mut self, lookup: &dyn ZipLookup) {
        if self.submission.is_in_flight() {
            tracing::debug!("Zip decode skipped: submission in flight");
            return;
        }
        if let Err(message) = validate_zip(&self.form.zip) {
            self.field_errors.insert(Field::Zip, message);
            return;
        }

        let zip = self.form.zip.clone();
        let session_id = self.session_id().to_string();
        match resolve_zip(lookup, &zip, &session_id).await {
            Ok(resolution) => self.apply_zip_resolution(&zip, resolution),
            Err(e) => {
                tracing::warn!("⚠️  Zip lookup failed for {}: {}", zip, e);
                self.notice = Some(Notice::Warning(
                    "We couldn't look up that zip code. Please enter your city and state."
                        .to_string(),
                ));
            }
        }
    }

    pub fn apply_zip_resolution(&mut self, zip: &str, resolution: ZipResolution) {
        self.zip_prompt = None;
        match resolution {
            ZipResolution::NoMatch => {
                self.form.city.clear();
                self.form.state.clear();
                self.notice = Some(Notice::Warning(format!(
                    "No city found for zip code {}.",
                    zip
                )));
            }
            ZipResolution::SingleMatch { city, state } => {
                self.fill_location(city, state);
            }
            ZipResolution::MultipleMatches(candidates) => {
                tracing::debug!("Zip {} needs disambiguation ({} candidates)", zip, candidates.len());
                self.zip_prompt = Some(ZipPrompt {
                    zip: zip.to_string(),
                    candidates,
                });
            }
        }
    }

    /// Applies the candidate at `index` from the open prompt and closes it.
    ///
    /// An out-of-range index leaves the prompt open.
    pub fn select_zip_candidate(&mut self, index: usize) -> Result<ZipCandidate, AppError> {
        let prompt = self
            .zip_prompt
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("No zip selection is pending".to_string()))?;
        let choice = prompt.candidates.get(index).cloned().ok_or_else(|| {
            AppError::BadRequest(format!(
                "Candidate {} out of range ({} available)",
                index,
                prompt.candidates.len()
            ))
        })?;
        self.zip_prompt = None;
        self.fill_location(choice.city.clone(), choice.state.clone());
        Ok(choice)
    }

    /// Closes the prompt leaving city/state unresolved.
    pub fn cancel_zip_prompt(&mut self) {
        self.zip_prompt = None;
    }

    fn fill_location(&mut self, city: String, state: String) {
        self.form.city = city;
        self.form.state = state;
        self.field_errors.remove(&Field::City);
        self.field_errors.remove(&Field::State);
    }

    // --- orchestrator hooks ---

    pub(crate) fn transition(&mut self, next: SubmissionState) {
        tracing::debug!("Submission {:?} -> {:?}", self.submission, next);
        self.history.push(next.clone());
        self.submission = next;
    }

    pub(crate) fn set_field_errors(&mut self, errors: FieldErrors) {
        self.field_errors = errors;
    }

    pub(crate) fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub(crate) fn clear_form(&mut self) {
        self.form = RawApplicantForm::default();
        self.field_errors.clear();
        self.zip_prompt = None;
    }
}
