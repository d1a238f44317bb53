use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::directory::Directory;
use super::domain::{PetId, RequestId, SlotInput, UserId, WeeklySlot};
use super::error::CareError;
use super::repository::CareStore;
use super::requests::{Mailbox, RequestSubmission};
use super::service::CareService;

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const ACTOR_HEADER: &str = "x-user-id";

type SharedService<S, D> = Arc<CareService<S, D>>;

/// Router builder exposing availability, request lifecycle, and review endpoints.
pub fn care_router<S, D>(service: SharedService<S, D>) -> Router
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    Router::new()
        .route(
            "/api/v1/caregivers/:user_id/availability",
            get(availability_handler::<S, D>)
                .put(put_availability_handler::<S, D>)
                .delete(delete_availability_handler::<S, D>),
        )
        .route(
            "/api/v1/caregivers/:user_id/walks",
            get(walks_handler::<S, D>),
        )
        .route(
            "/api/v1/caregivers/:user_id/reviews",
            post(submit_review_handler::<S, D>),
        )
        .route(
            "/api/v1/caregivers/:user_id/reviews/summary",
            get(review_summary_handler::<S, D>),
        )
        .route(
            "/api/v1/caregivers/:user_id/reviews/eligibility",
            get(eligibility_handler::<S, D>),
        )
        .route(
            "/api/v1/pets/:pet_id/requests",
            post(create_request_handler::<S, D>),
        )
        .route("/api/v1/requests", get(list_requests_handler::<S, D>))
        .route(
            "/api/v1/requests/:request_id",
            get(request_handler::<S, D>).delete(cancel_handler::<S, D>),
        )
        .route(
            "/api/v1/requests/:request_id/accept",
            patch(accept_handler::<S, D>),
        )
        .route(
            "/api/v1/requests/:request_id/reject",
            patch(reject_handler::<S, D>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsPayload {
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingPayload {
    pub rating: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailboxQuery {
    #[serde(rename = "box", default)]
    pub mailbox: Mailbox,
}

#[derive(Debug, Clone, Serialize)]
struct AvailabilityView {
    caregiver_id: UserId,
    slots: Vec<WeeklySlot>,
}

fn actor_from(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing {ACTOR_HEADER} header"),
                "code": "unauthenticated",
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
}

/// HTTP status for each care failure.
pub fn status_for(error: &CareError) -> StatusCode {
    match error {
        CareError::Forbidden(_) | CareError::NotEligible => StatusCode::FORBIDDEN,
        CareError::NotFound(_) => StatusCode::NOT_FOUND,
        CareError::InvalidTransition { .. } | CareError::SlotConflict(_) => StatusCode::CONFLICT,
        CareError::InvalidSlot(_)
        | CareError::InvalidRating(_)
        | CareError::InvalidType(_)
        | CareError::EmptyAgreement
        | CareError::SlotNotAvailable(_)
        | CareError::NoOwner(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CareError::Repository(_) | CareError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: CareError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (status_for(&error), Json(payload)).into_response()
}

/// Malformed bodies answer in the same `{"error","code"}` shape as domain failures.
fn rejection_response(rejection: JsonRejection, code: &'static str) -> Response {
    let (status, code) = match &rejection {
        JsonRejection::JsonDataError(_) => (StatusCode::UNPROCESSABLE_ENTITY, code),
        _ => (rejection.status(), "invalid_payload"),
    };
    let payload = json!({
        "error": rejection.body_text(),
        "code": code,
    });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CareError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn availability_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let caregiver = UserId(user_id);
    let result = service
        .availability(&caregiver)
        .map(|slots| AvailabilityView {
            caregiver_id: caregiver.clone(),
            slots,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn put_availability_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    payload: Result<Json<SlotsPayload>, JsonRejection>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection, "invalid_slot"),
    };
    let caregiver = UserId(user_id);
    let result = service
        .put_availability(&actor, &caregiver, &payload.slots)
        .map(|slots| AvailabilityView {
            caregiver_id: caregiver.clone(),
            slots,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_availability_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    payload: Result<Json<SlotsPayload>, JsonRejection>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection, "invalid_slot"),
    };
    let caregiver = UserId(user_id);
    let result = service
        .delete_availability(&actor, &caregiver, &payload.slots)
        .map(|slots| AvailabilityView {
            caregiver_id: caregiver.clone(),
            slots,
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn walks_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    respond(StatusCode::OK, service.scheduled_walks(&UserId(user_id)))
}

pub(crate) async fn create_request_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(pet_id): Path<String>,
    submission: Result<Json<RequestSubmission>, JsonRejection>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(submission) = match submission {
        Ok(submission) => submission,
        Err(rejection) => return rejection_response(rejection, "invalid_payload"),
    };
    respond(
        StatusCode::CREATED,
        service.create_request(&actor, &PetId(pet_id), submission),
    )
}

pub(crate) async fn list_requests_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Query(query): Query<MailboxQuery>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(StatusCode::OK, service.requests(&actor, query.mailbox))
}

pub(crate) async fn request_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.request(&actor, &RequestId(request_id)),
    )
}

pub(crate) async fn accept_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.accept(&actor, &RequestId(request_id)),
    )
}

pub(crate) async fn reject_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.reject(&actor, &RequestId(request_id)),
    )
}

pub(crate) async fn cancel_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        service.cancel(&actor, &RequestId(request_id)),
    )
}

pub(crate) async fn review_summary_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let viewer = actor_from(&headers).ok();
    respond(
        StatusCode::OK,
        service.review_summary(&UserId(user_id), viewer.as_ref()),
    )
}

pub(crate) async fn eligibility_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let viewer = match actor_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let caregiver = UserId(user_id);
    let result = service
        .can_review(&viewer, &caregiver)
        .map(|can_review| json!({ "caregiver_id": caregiver, "can_review": can_review }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_review_handler<S, D>(
    State(service): State<SharedService<S, D>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    payload: Result<Json<RatingPayload>, JsonRejection>,
) -> Response
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    let viewer = match actor_from(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection, "invalid_rating"),
    };
    respond(
        StatusCode::OK,
        service.submit_rating(&viewer, &UserId(user_id), payload.rating),
    )
}
