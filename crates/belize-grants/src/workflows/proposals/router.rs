use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::blueprint::{ProposalKind, WizardBlueprint};
use super::context::{ApplicantContextProvider, UserDataService};
use super::controller::{SubmissionOutcome, WizardController, WizardError};
use super::domain::{ApplicationId, Attachment, Draft};
use super::drafts::{DraftCache, CONCEPT_PAPER_DRAFT_KEY};
use super::repository::ProposalRepository;
use crate::error::AppError;

/// Handle for an open wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Applicant profile source shared by every session.
pub type ProfileProvider = ApplicantContextProvider<dyn UserDataService>;

/// Open wizard sessions sharing one backend and one local draft cache.
///
/// A session is dropped once its proposal has been submitted in full, or
/// when the client closes it.
pub struct ProposalSessions<R, C> {
    repository: Arc<R>,
    drafts: Arc<C>,
    profiles: Option<Arc<ProfileProvider>>,
    sessions: Mutex<HashMap<SessionId, Arc<WizardController<R>>>>,
}

impl<R, C> ProposalSessions<R, C>
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    pub fn new(repository: Arc<R>, drafts: Arc<C>) -> Self {
        Self {
            repository,
            drafts,
            profiles: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Enable profile prefill from `provider`.
    pub fn with_profiles(mut self, provider: Arc<ProfileProvider>) -> Self {
        self.profiles = Some(provider);
        self
    }

    pub fn open(&self, kind: ProposalKind) -> (SessionId, Arc<WizardController<R>>) {
        let session_id = next_session_id();
        let controller = Arc::new(WizardController::new(
            kind.blueprint(),
            self.repository.clone(),
        ));
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(session_id.clone(), controller.clone());
        info!(session = %session_id.0, ?kind, "proposal session opened");
        (session_id, controller)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<WizardController<R>>> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(session_id)
            .cloned()
    }

    /// Forget a session. Returns `false` if it was not open.
    pub fn close(&self, session_id: &SessionId) -> bool {
        let removed = self
            .sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(session_id)
            .is_some();
        if removed {
            info!(session = %session_id.0, "proposal session closed");
        }
        removed
    }

    pub fn open_count(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn drafts(&self) -> &C {
        &self.drafts
    }

    pub fn profiles(&self) -> Option<&ProfileProvider> {
        self.profiles.as_deref()
    }
}

/// Router builder exposing the proposal wizard and concept-paper draft endpoints.
pub fn proposal_router<R, C>(sessions: Arc<ProposalSessions<R, C>>) -> Router
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    Router::new()
        .route("/api/v1/proposals", post(open_handler::<R, C>))
        .route(
            "/api/v1/proposals/:session_id",
            get(status_handler::<R, C>).delete(close_handler::<R, C>),
        )
        .route(
            "/api/v1/proposals/:session_id/advance",
            post(advance_handler::<R, C>),
        )
        .route(
            "/api/v1/proposals/:session_id/goto",
            post(goto_handler::<R, C>),
        )
        .route(
            "/api/v1/proposals/:session_id/save",
            post(save_handler::<R, C>),
        )
        .route(
            "/api/v1/proposals/:session_id/prefill",
            post(prefill_handler::<R, C>),
        )
        .route(
            "/api/v1/proposals/:session_id/submit",
            post(submit_handler::<R, C>),
        )
        .route("/api/v1/profile", get(profile_handler::<R, C>))
        .route(
            "/api/v1/profile/refresh",
            post(refresh_profile_handler::<R, C>),
        )
        .route(
            "/api/v1/concept-paper/draft",
            put(save_concept_draft_handler::<R, C>)
                .get(load_concept_draft_handler::<R, C>)
                .delete(clear_concept_draft_handler::<R, C>),
        )
        .with_state(sessions)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenSessionRequest {
    pub(crate) kind: ProposalKind,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FieldsRequest {
    #[serde(default)]
    pub(crate) fields: Draft,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoToRequest {
    pub(crate) step: usize,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) attachments: Vec<AttachmentUpload>,
}

/// Attachment as posted by the browser, content base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub field_tag: String,
    pub content_base64: String,
}

impl AttachmentUpload {
    fn decode(self) -> Result<Attachment, String> {
        let content = BASE64
            .decode(self.content_base64.as_bytes())
            .map_err(|err| format!("attachment '{}' is not valid base64: {err}", self.file_name))?;
        Ok(Attachment {
            file_name: self.file_name,
            field_tag: self.field_tag,
            content,
        })
    }
}

/// Session state as exposed to the form.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub kind: ProposalKind,
    pub step_count: usize,
    pub current_step: usize,
    pub current_step_title: &'static str,
    pub completed_steps: BTreeSet<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    pub draft: Draft,
}

async fn session_view<R>(session_id: &SessionId, controller: &WizardController<R>) -> SessionView
where
    R: ProposalRepository + 'static,
{
    let state = controller.snapshot().await;
    let blueprint: &WizardBlueprint = controller.blueprint();
    SessionView {
        session_id: session_id.clone(),
        kind: blueprint.kind(),
        step_count: blueprint.step_count(),
        current_step: state.current_step,
        current_step_title: blueprint
            .step(state.current_step)
            .map(|step| step.title)
            .unwrap_or_default(),
        completed_steps: state.completed_steps,
        application_id: state.application_id,
        draft: state.draft,
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

fn unknown_session(session_id: &SessionId) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("proposal session '{}' not found", session_id.0),
    )
}

pub(crate) fn wizard_error_response(error: WizardError) -> Response {
    match error {
        WizardError::Validation { step, errors } => {
            let payload = json!({
                "error": format!("step {step} has invalid fields"),
                "step": step,
                "errors": errors,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        WizardError::IncompleteSteps { missing } => {
            let payload = json!({
                "error": "all steps must be completed before submitting",
                "missing_steps": missing,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        WizardError::Busy => error_response(StatusCode::CONFLICT, WizardError::Busy.to_string()),
        other @ (WizardError::Persistence(_) | WizardError::Submission(_)) => {
            error_response(StatusCode::BAD_GATEWAY, other.to_string())
        }
    }
}

pub(crate) async fn open_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Json(request): Json<OpenSessionRequest>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let (session_id, controller) = sessions.open(request.kind);
    let view = session_view(&session_id, &controller).await;
    (StatusCode::CREATED, Json(view)).into_response()
}

pub(crate) async fn status_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    match sessions.get(&session_id) {
        Some(controller) => {
            let view = session_view(&session_id, &controller).await;
            (StatusCode::OK, Json(view)).into_response()
        }
        None => unknown_session(&session_id),
    }
}

pub(crate) async fn close_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    if sessions.close(&session_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        unknown_session(&session_id)
    }
}

pub(crate) async fn advance_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
    Json(request): Json<FieldsRequest>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    let Some(controller) = sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };

    match controller.advance(request.fields).await {
        Ok(_) => {
            let view = session_view(&session_id, &controller).await;
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn goto_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
    Json(request): Json<GoToRequest>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    let Some(controller) = sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };

    let moved = controller.go_to(request.step);
    let view = session_view(&session_id, &controller).await;
    let payload = json!({ "moved": moved, "session": view });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn save_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
    Json(request): Json<FieldsRequest>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    let Some(controller) = sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };

    match controller.save_draft(request.fields).await {
        Ok(_) => {
            let view = session_view(&session_id, &controller).await;
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn submit_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    let Some(controller) = sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };

    let attachments = match request
        .attachments
        .into_iter()
        .map(AttachmentUpload::decode)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(attachments) => attachments,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match controller.submit(attachments).await {
        Ok(outcome @ SubmissionOutcome::Submitted { .. }) => {
            if controller.blueprint().kind() == ProposalKind::ConceptPaper {
                if let Err(err) = sessions.drafts().clear(CONCEPT_PAPER_DRAFT_KEY) {
                    warn!(
                        application_id = %outcome.application_id(),
                        error = %err,
                        "concept paper submitted but local draft was not cleared"
                    );
                }
            }
            sessions.close(&session_id);
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Ok(outcome @ SubmissionOutcome::Degraded { .. }) => {
            (StatusCode::ACCEPTED, Json(outcome)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn prefill_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let session_id = SessionId(session_id);
    let Some(controller) = sessions.get(&session_id) else {
        return unknown_session(&session_id);
    };
    let Some(profiles) = sessions.profiles() else {
        return profiles_not_configured();
    };

    let context = match profiles.current().await {
        Ok(context) => context,
        Err(err) => {
            warn!(session = %session_id.0, error = %err, "applicant profile lookup failed");
            return error_response(StatusCode::BAD_GATEWAY, err.to_string());
        }
    };
    if !controller.prefill(&context) {
        return AppError::from(WizardError::Busy).into_response();
    }

    let view = session_view(&session_id, &controller).await;
    (StatusCode::OK, Json(view)).into_response()
}

pub(crate) async fn profile_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let Some(profiles) = sessions.profiles() else {
        return profiles_not_configured();
    };
    match profiles.current().await {
        Ok(context) => (StatusCode::OK, Json(context.as_ref().clone())).into_response(),
        Err(err) => error_response(StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

pub(crate) async fn refresh_profile_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    let Some(profiles) = sessions.profiles() else {
        return profiles_not_configured();
    };
    match profiles.refresh().await {
        Ok(context) => (StatusCode::OK, Json(context.as_ref().clone())).into_response(),
        Err(err) => error_response(StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

fn profiles_not_configured() -> Response {
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "applicant profile service is not configured",
    )
}

pub(crate) async fn save_concept_draft_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
    Json(draft): Json<Draft>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    match sessions.drafts().save(CONCEPT_PAPER_DRAFT_KEY, &draft) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn load_concept_draft_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    match sessions.drafts().load(CONCEPT_PAPER_DRAFT_KEY) {
        Ok(Some(draft)) => (StatusCode::OK, Json(json!({ "draft": draft }))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no saved concept paper draft"),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn clear_concept_draft_handler<R, C>(
    State(sessions): State<Arc<ProposalSessions<R, C>>>,
) -> Response
where
    R: ProposalRepository + 'static,
    C: DraftCache + 'static,
{
    match sessions.drafts().clear(CONCEPT_PAPER_DRAFT_KEY) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
