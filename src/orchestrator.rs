//! Submission orchestrator.
//!
//! Drives one attempt through `Idle → TokenPending → Submitting → {Succeeded, Failed}`.
//! A failed attempt always lands back on `Idle` with the form untouched, so the
//! applicant can edit and retry; there is no cool-down or attempt cap.

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::AppError;
use crate::gating::{TokenProvider, NOT_READY_MESSAGE, SUBMIT_ACTION};
use crate::host::{HostMessage, HostNotifier};
use crate::models::{SubmissionPayload, SubmitResponse};
use crate::session::{Notice, SubmissionState, WidgetSession, ZIP_SELECTION_MESSAGE};
use crate::validation::{validate_applicant, FieldErrors};

/// Shown when the backend gives no message of its own.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We couldn't submit your application. Please try again.";

/// The remote end of `/api/submit`.
#[async_trait]
pub trait SubmissionBackend: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, AppError>;
}

/// Result of one `submit` call, as seen by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; the form was cleared and the success view is up.
    Succeeded,
    /// Local validation failed; nothing left the widget.
    Invalid(FieldErrors),
    /// Gating, dealer data or zip selection not ready; nothing left the widget.
    NotReady(String),
    /// The attempt reached the network and failed. Carries the message shown.
    Failed(String),
    /// A submission is in flight or already succeeded.
    Ignored,
}

pub struct SubmissionOrchestrator {
    gate: Arc<dyn TokenProvider>,
    backend: Arc<dyn SubmissionBackend>,
    host: Arc<dyn HostNotifier>,
}

impl SubmissionOrchestrator {
    pub fn new(
        gate: Arc<dyn TokenProvider>,
        backend: Arc<dyn SubmissionBackend>,
        host: Arc<dyn HostNotifier>,
    ) -> Self {
        Self {
            gate,
            backend,
            host,
        }
    }

    /// Runs the submit action against `session`.
    ///
    /// The `&mut` borrow makes the session single-writer for the whole attempt;
    /// the state guard below keeps a stale double-click from starting a second
    /// attempt once the first has finished.
    pub async fn submit(&self, session: &mut WidgetSession) -> SubmitOutcome {
        if let Some(prompt) = session.zip_prompt() {
            tracing::debug!("Submit held: city selection open for zip {}", prompt.zip);
            return SubmitOutcome::NotReady(ZIP_SELECTION_MESSAGE.to_string());
        }
        if !session.can_submit() {
            tracing::debug!("Submit ignored in state {:?}", session.ui_state());
            return SubmitOutcome::Ignored;
        }

        // Authoritative pre-submission validation
        let applicant = match validate_applicant(session.form()) {
            Ok(applicant) => applicant,
            Err(errors) => {
                tracing::info!("Submission blocked by {} invalid field(s)", errors.len());
                session.set_field_errors(errors.clone());
                return SubmitOutcome::Invalid(errors);
            }
        };

        let Some(dealer) = session.dealer().cloned() else {
            return SubmitOutcome::NotReady(NOT_READY_MESSAGE.to_string());
        };

        session.transition(SubmissionState::TokenPending);
        let token = if self.gate.is_ready() {
            self.gate.obtain_token(SUBMIT_ACTION).await
        } else {
            Err(AppError::GatingUnavailable(NOT_READY_MESSAGE.to_string()))
        };
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("⚠️  Submission aborted, no gating token: {}", e);
                session.set_notice(Notice::Error(NOT_READY_MESSAGE.to_string()));
                session.transition(SubmissionState::Idle);
                return SubmitOutcome::NotReady(NOT_READY_MESSAGE.to_string());
            }
        };

        let payload = SubmissionPayload::build(&applicant, &dealer, token.as_str());
        session.transition(SubmissionState::Submitting);
        tracing::info!("Submitting application for dealer {}", dealer.id);

        let failure = match self.backend.submit(&payload).await {
            Ok(SubmitResponse { success: true, .. }) => {
                session.transition(SubmissionState::Succeeded);
                session.clear_form();
                session.dismiss_notice();
                self.host.notify(HostMessage::Submitted);
                tracing::info!("✅ Application submitted for dealer {}", dealer.id);
                return SubmitOutcome::Succeeded;
            }
            Ok(SubmitResponse { message, .. }) => message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            Err(e) => {
                tracing::error!("❌ Submission transport failure: {}", e);
                e.user_message()
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
            }
        };

        tracing::warn!("Submission failed: {}", failure);
        session.transition(SubmissionState::Failed(failure.clone()));
        session.set_notice(Notice::Error(failure.clone()));
        session.transition(SubmissionState::Idle);
        SubmitOutcome::Failed(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{dealer, valid_form};
    use crate::gating::GatingToken;
    use crate::host::ChannelNotifier;
    use crate::session::UiState;
    use crate::theme::WidgetOptions;
    use crate::validation::Field;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Gate {
        ready: bool,
        issued: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for Gate {
        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn obtain_token(&self, action: &str) -> Result<GatingToken, AppError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            Ok(GatingToken::new(format!("{}-token-{}", action, n)))
        }
    }

    struct Backend {
        reply: Result<SubmitResponse, AppError>,
        seen: Mutex<Vec<SubmissionPayload>>,
    }

    #[async_trait]
    impl SubmissionBackend for Backend {
        async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitResponse, AppError> {
            self.seen.lock().unwrap().push(payload.clone());
            self.reply.clone()
        }
    }

    fn filled_session() -> WidgetSession {
        let mut session = WidgetSession::with_dealer(WidgetOptions::default(), dealer());
        let form = valid_form();
        for (field, value) in [
            (Field::FirstName, form.first_name.as_str()),
            (Field::MiddleInitial, form.middle_initial.as_str()),
            (Field::LastName, form.last_name.as_str()),
            (Field::Address, form.address.as_str()),
            (Field::Zip, form.zip.as_str()),
            (Field::City, form.city.as_str()),
            (Field::State, form.state.as_str()),
            (Field::MobilePhone, form.mobile_phone.as_str()),
            (Field::Email, form.email.as_str()),
        ] {
            session.set_field(field, value);
        }
        session.set_consent(true);
        session
    }

    fn orchestrator(
        ready: bool,
        reply: Result<SubmitResponse, AppError>,
    ) -> (
        SubmissionOrchestrator,
        Arc<Gate>,
        Arc<Backend>,
        tokio::sync::mpsc::UnboundedReceiver<String>,
    ) {
        let gate = Arc::new(Gate {
            ready,
            issued: AtomicUsize::new(0),
        });
        let backend = Arc::new(Backend {
            reply,
            seen: Mutex::new(vec![]),
        });
        let (host, rx) = ChannelNotifier::new();
        let orchestrator =
            SubmissionOrchestrator::new(gate.clone(), backend.clone(), Arc::new(host));
        (orchestrator, gate, backend, rx)
    }

    #[tokio::test]
    async fn test_success_clears_form_and_notifies_host() {
        let (orchestrator, _, backend, mut rx) = orchestrator(
            true,
            Ok(SubmitResponse {
                success: true,
                message: None,
            }),
        );
        let mut session = filled_session();

        assert_eq!(orchestrator.submit(&mut session).await, SubmitOutcome::Succeeded);
        assert_eq!(session.ui_state(), UiState::SuccessDisplayed);
        assert!(session.form().is_empty());
        assert_eq!(
            session.history(),
            &[
                SubmissionState::Idle,
                SubmissionState::TokenPending,
                SubmissionState::Submitting,
                SubmissionState::Succeeded,
            ]
        );
        assert_eq!(rx.recv().await.as_deref(), Some("submitted::"));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].recaptcha, "submit-token-0");
        assert_eq!(seen[0].dealer_name, "Main Street Motors");
        assert_eq!(seen[0].additional_adf_emails, "a@x.com,b@y.com");
        assert_eq!(seen[0].mobile_phone, "5125550100");
    }

    #[tokio::test]
    async fn test_success_is_terminal() {
        let (orchestrator, gate, _, _rx) = orchestrator(
            true,
            Ok(SubmitResponse {
                success: true,
                message: None,
            }),
        );
        let mut session = filled_session();
        orchestrator.submit(&mut session).await;
        assert_eq!(orchestrator.submit(&mut session).await, SubmitOutcome::Ignored);
        assert_eq!(gate.issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_message_is_surfaced_and_form_kept() {
        let (orchestrator, _, _, _rx) = orchestrator(
            true,
            Ok(SubmitResponse {
                success: false,
                message: Some("Declined".to_string()),
            }),
        );
        let mut session = filled_session();
        let before = session.form().clone();

        assert_eq!(
            orchestrator.submit(&mut session).await,
            SubmitOutcome::Failed("Declined".to_string())
        );
        assert_eq!(session.ui_state(), UiState::Idle);
        assert!(session.can_submit());
        assert_eq!(session.notice().map(|n| n.message()), Some("Declined"));
        assert_eq!(session.form(), &before);
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_message() {
        let (orchestrator, _, _, _rx) = orchestrator(
            true,
            Err(AppError::TransportError("connection refused".to_string())),
        );
        let mut session = filled_session();
        assert_eq!(
            orchestrator.submit(&mut session).await,
            SubmitOutcome::Failed(GENERIC_FAILURE_MESSAGE.to_string())
        );
        assert_eq!(session.submission(), &SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_invalid_form_never_requests_token() {
        let (orchestrator, gate, backend, _rx) = orchestrator(
            true,
            Ok(SubmitResponse {
                success: true,
                message: None,
            }),
        );
        let mut session = filled_session();
        session.set_consent(false);

        let outcome = orchestrator.submit(&mut session).await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(ref e) if e.contains_key(&Field::ConsentGiven)));
        assert_eq!(gate.issued.load(Ordering::SeqCst), 0);
        assert!(backend.seen.lock().unwrap().is_empty());
        assert_eq!(session.history(), &[SubmissionState::Idle]);
    }

    #[tokio::test]
    async fn test_gate_not_ready_aborts_without_network() {
        let (orchestrator, _, backend, _rx) = orchestrator(
            false,
            Ok(SubmitResponse {
                success: true,
                message: None,
            }),
        );
        let mut session = filled_session();
        assert_eq!(
            orchestrator.submit(&mut session).await,
            SubmitOutcome::NotReady(NOT_READY_MESSAGE.to_string())
        );
        assert!(backend.seen.lock().unwrap().is_empty());
        assert_eq!(session.submission(), &SubmissionState::Idle);
        assert_eq!(
            session.history(),
            &[
                SubmissionState::Idle,
                SubmissionState::TokenPending,
                SubmissionState::Idle
            ]
        );
    }
}
