use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{Choice, EvidenceList, ExclusionCategory, OutcomeKey};
use super::pointer::{Node, Pointer};
use super::service::WizardService;
use super::session::{Advance, RouteResolution, SessionError};
use super::steps::StepPath;
use super::submission::{ReportGenerator, SubmissionFailure, SubmitOutcome};

type SharedService<G> = Arc<WizardService<G>>;

/// Router builder exposing the wizard session over HTTP.
pub fn wizard_router<G>(service: SharedService<G>) -> Router
where
    G: ReportGenerator + 'static,
{
    Router::new()
        .route("/api/v1/wizard", get(progress_handler::<G>))
        .route("/api/v1/wizard/steps/:step", get(step_handler::<G>))
        .route("/api/v1/wizard/steps/:step/next", post(next_handler::<G>))
        .route("/api/v1/wizard/steps/:step/edit", post(edit_handler::<G>))
        .route(
            "/api/v1/wizard/fields",
            put(update_field_handler::<G>).delete(remove_field_handler::<G>),
        )
        .route("/api/v1/wizard/fields/blur", post(blur_handler::<G>))
        .route("/api/v1/wizard/cohorts", post(add_cohort_handler::<G>))
        .route(
            "/api/v1/wizard/cohorts/:cohort",
            delete(remove_cohort_handler::<G>),
        )
        .route(
            "/api/v1/wizard/cohorts/:cohort/exclusions",
            post(add_exclusion_handler::<G>),
        )
        .route(
            "/api/v1/wizard/cohorts/:cohort/exclusions/:exclusion",
            delete(remove_exclusion_handler::<G>),
        )
        .route(
            "/api/v1/wizard/outcomes/:outcome/override",
            put(ela_override_handler::<G>),
        )
        .route("/api/v1/wizard/evidence/:list", post(add_evidence_handler::<G>))
        .route(
            "/api/v1/wizard/evidence/:list/:evidence_id",
            delete(remove_evidence_handler::<G>),
        )
        .route("/api/v1/wizard/review", get(review_handler::<G>))
        .route("/api/v1/wizard/submit", post(submit_handler::<G>))
        .route("/api/v1/wizard/submit/cancel", post(cancel_handler::<G>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub pointer: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct FieldRef {
    pub pointer: String,
}

#[derive(Debug, Deserialize)]
pub struct ExclusionRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideToggle {
    pub use_default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EvidenceRequest {
    File {
        name: String,
        size: u64,
        #[serde(rename = "type", default)]
        mime_type: Option<String>,
    },
    Link {
        title: String,
        url: String,
    },
}

fn error_payload(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, Json(payload)).into_response()
}

fn session_error_response(error: SessionError) -> Response {
    match error {
        SessionError::Locked { redirect, .. } => {
            let payload = json!({
                "error": error.to_string(),
                "redirect": redirect.route(),
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        SessionError::TerminalStep => error_payload(StatusCode::CONFLICT, error.to_string()),
        SessionError::Pointer(_) | SessionError::UnknownSection(_) => {
            error_payload(StatusCode::BAD_REQUEST, error.to_string())
        }
        SessionError::CohortLimit
        | SessionError::LastCohort
        | SessionError::EvidenceLimit
        | SessionError::FilesOnly
        | SessionError::DuplicateExclusion(_) => {
            error_payload(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        SessionError::UnknownId { .. } | SessionError::OutOfRange { .. } => {
            error_payload(StatusCode::NOT_FOUND, error.to_string())
        }
        SessionError::Encode(_) => {
            error_payload(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}

fn parse_step(raw: &str) -> Result<StepPath, Response> {
    StepPath::parse(raw)
        .ok_or_else(|| error_payload(StatusCode::NOT_FOUND, format!("unknown step '{raw}'")))
}

async fn progress_handler<G>(State(service): State<SharedService<G>>) -> Response
where
    G: ReportGenerator + 'static,
{
    let view = service.with_session(|session| session.progress());
    (StatusCode::OK, Json(view)).into_response()
}

async fn step_handler<G>(
    State(service): State<SharedService<G>>,
    Path(step): Path<String>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let step = match parse_step(&step) {
        Ok(step) => step,
        Err(response) => return response,
    };
    match service.with_session(|session| session.step_view(step)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn next_handler<G>(
    State(service): State<SharedService<G>>,
    Path(step): Path<String>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let step = match parse_step(&step) {
        Ok(step) => step,
        Err(response) => return response,
    };
    match service.with_session(|session| session.advance(step)) {
        Ok(advance @ Advance::Advanced { .. }) => (StatusCode::OK, Json(advance)).into_response(),
        Ok(blocked @ Advance::Blocked { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(blocked)).into_response()
        }
        Err(error) => session_error_response(error),
    }
}

async fn edit_handler<G>(
    State(service): State<SharedService<G>>,
    Path(step): Path<String>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let step = match parse_step(&step) {
        Ok(step) => step,
        Err(response) => return response,
    };
    let step = service.with_session(|session| session.edit_from(step));
    let payload = json!({
        "step": step,
        "route": step.route(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

async fn update_field_handler<G>(
    State(service): State<SharedService<G>>,
    Json(update): Json<FieldUpdate>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let pointer = Pointer::parse(&update.pointer);
    let value = Node::from(update.value);
    match service.with_session(|session| session.update_field(&pointer, value, Instant::now())) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn remove_field_handler<G>(
    State(service): State<SharedService<G>>,
    Json(field): Json<FieldRef>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let pointer = Pointer::parse(&field.pointer);
    match service.with_session(|session| session.remove_field(&pointer, Instant::now())) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn blur_handler<G>(
    State(service): State<SharedService<G>>,
    Json(field): Json<FieldRef>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let pointer = Pointer::parse(&field.pointer);
    match service.with_session(|session| session.validate_field(&pointer)) {
        Ok(message) => {
            let payload = json!({
                "pointer": pointer,
                "valid": message.is_none(),
                "error": message,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => session_error_response(error),
    }
}

async fn add_cohort_handler<G>(State(service): State<SharedService<G>>) -> Response
where
    G: ReportGenerator + 'static,
{
    match service.with_session(|session| session.add_cohort(Instant::now())) {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn remove_cohort_handler<G>(
    State(service): State<SharedService<G>>,
    Path(cohort_id): Path<String>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    match service.with_session(|session| session.remove_cohort(&cohort_id, Instant::now())) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn add_exclusion_handler<G>(
    State(service): State<SharedService<G>>,
    Path(cohort_index): Path<usize>,
    Json(request): Json<ExclusionRequest>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let Some(category) = ExclusionCategory::from_value(&request.category) else {
        return error_payload(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "exclusion category must be one of: {}",
                ExclusionCategory::allowed_values()
            ),
        );
    };
    match service
        .with_session(|session| session.add_exclusion(cohort_index, category, Instant::now()))
    {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn remove_exclusion_handler<G>(
    State(service): State<SharedService<G>>,
    Path((cohort_index, exclusion_index)): Path<(usize, usize)>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    match service.with_session(|session| {
        session.remove_exclusion(cohort_index, exclusion_index, Instant::now())
    }) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn ela_override_handler<G>(
    State(service): State<SharedService<G>>,
    Path(outcome): Path<String>,
    Json(toggle): Json<OverrideToggle>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let Some(outcome) = OutcomeKey::ordered()
        .into_iter()
        .find(|key| key.key() == outcome)
    else {
        return error_payload(StatusCode::NOT_FOUND, format!("unknown outcome '{outcome}'"));
    };
    match service.with_session(|session| {
        session.set_ela_override(outcome, toggle.use_default, Instant::now())
    }) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn add_evidence_handler<G>(
    State(service): State<SharedService<G>>,
    Path(list): Path<String>,
    Json(request): Json<EvidenceRequest>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let Some(list) = EvidenceList::parse(&list) else {
        return error_payload(StatusCode::NOT_FOUND, format!("unknown evidence list '{list}'"));
    };
    let now = Instant::now();
    let result = service.with_session(|session| match request {
        EvidenceRequest::File {
            name,
            size,
            mime_type,
        } => session.add_file_evidence(list, &name, size, mime_type, now),
        EvidenceRequest::Link { title, url } => session.add_link_evidence(list, &title, &url, now),
    });
    match result {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn remove_evidence_handler<G>(
    State(service): State<SharedService<G>>,
    Path((list, evidence_id)): Path<(String, String)>,
) -> Response
where
    G: ReportGenerator + 'static,
{
    let Some(list) = EvidenceList::parse(&list) else {
        return error_payload(StatusCode::NOT_FOUND, format!("unknown evidence list '{list}'"));
    };
    match service.with_session(|session| session.remove_evidence(list, &evidence_id, Instant::now())) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

async fn review_handler<G>(State(service): State<SharedService<G>>) -> Response
where
    G: ReportGenerator + 'static,
{
    let result = service.with_session(|session| {
        match session.resolve_route(StepPath::Review) {
            RouteResolution::Redirect(redirect) => Err(SessionError::Locked {
                step: StepPath::Review,
                redirect,
            }),
            RouteResolution::Allowed(_) => Ok(session.review()),
        }
    });
    match result {
        Ok(Ok(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(Err(issues)) => {
            let payload = json!({
                "error": "Validation failed.",
                "issues": issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(error) => session_error_response(error),
    }
}

async fn submit_handler<G>(State(service): State<SharedService<G>>) -> Response
where
    G: ReportGenerator + 'static,
{
    let outcome = service.submit().await;
    let status = match &outcome {
        SubmitOutcome::Ignored => StatusCode::ACCEPTED,
        SubmitOutcome::Succeeded { .. } => StatusCode::OK,
        SubmitOutcome::Failed { failure, .. } => match failure {
            SubmissionFailure::Blocked => StatusCode::UNPROCESSABLE_ENTITY,
            SubmissionFailure::Cancelled => StatusCode::CONFLICT,
            SubmissionFailure::Network
            | SubmissionFailure::Rejected { .. }
            | SubmissionFailure::MalformedResponse => StatusCode::BAD_GATEWAY,
        },
    };
    (status, Json(outcome)).into_response()
}

async fn cancel_handler<G>(State(service): State<SharedService<G>>) -> Response
where
    G: ReportGenerator + 'static,
{
    let cancelled = service.cancel_submission();
    (StatusCode::ACCEPTED, Json(json!({ "cancelled": cancelled }))).into_response()
}
