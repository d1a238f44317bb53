use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::care::domain::{
    CaregiverReview, DayOfWeek, PetId, RequestId, ScheduledWalk, SlotInput, TimeSlot, UserId,
    WeeklySlot,
};
use crate::care::repository::{
    AvailabilityRepository, RepositoryError, RequestRepository, ReviewRepository,
};
use crate::care::requests::{CareRequest, RequestStatus, RequestSubmission};
use crate::care::{care_router, CareService, InMemoryCareStore, InMemoryDirectory};

pub(super) const OWNER: &str = "olivia";
pub(super) const SECOND_OWNER: &str = "oscar";
pub(super) const WALKER: &str = "wendy";
pub(super) const SECOND_WALKER: &str = "walt";
pub(super) const STRANGER: &str = "sam";
pub(super) const PET: &str = "rex";
pub(super) const SECOND_PET: &str = "fido";
pub(super) const STRAY: &str = "stray";

pub(super) type TestService = CareService<InMemoryCareStore, InMemoryDirectory>;

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn pet(id: &str) -> PetId {
    PetId(id.to_string())
}

pub(super) fn slot(day: DayOfWeek, hour: u8, minute: u8) -> WeeklySlot {
    WeeklySlot::new(day, TimeSlot::new(hour, minute).expect("valid slot"))
}

pub(super) fn inputs(slots: &[(DayOfWeek, &str)]) -> Vec<SlotInput> {
    slots
        .iter()
        .map(|(day, time)| SlotInput::new(*day, *time))
        .collect()
}

pub(super) fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_pet(PET, Some(OWNER))
        .with_pet(SECOND_PET, Some(SECOND_OWNER))
        .with_pet(STRAY, None)
        .with_caregiver(WALKER)
        .with_caregiver(SECOND_WALKER)
}

pub(super) fn build_service() -> (TestService, Arc<InMemoryCareStore>) {
    let store = Arc::new(InMemoryCareStore::new());
    let service = CareService::new(store.clone(), Arc::new(directory()));
    (service, store)
}

pub(super) fn care_submission(slots: &[(DayOfWeek, &str)]) -> RequestSubmission {
    RequestSubmission {
        kind: "care".to_string(),
        message: Some("Happy to walk Rex on weekday mornings".to_string()),
        slots: inputs(slots),
    }
}

pub(super) fn adopt_submission() -> RequestSubmission {
    RequestSubmission {
        kind: "adopt".to_string(),
        message: Some("We have a big yard".to_string()),
        slots: Vec::new(),
    }
}

pub(super) fn monday_mornings() -> [(DayOfWeek, &'static str); 2] {
    [(DayOfWeek::Monday, "09:00"), (DayOfWeek::Monday, "09:15")]
}

/// Open `slots` on the walker's calendar and submit a matching care request for `pet_id`.
pub(super) fn pending_care_request(
    service: &TestService,
    walker: &str,
    pet_id: &str,
    slots: &[(DayOfWeek, &str)],
) -> CareRequest {
    service
        .put_availability(&user(walker), &user(walker), &inputs(slots))
        .expect("availability opens");
    service
        .create_request(&user(walker), &pet(pet_id), care_submission(slots))
        .expect("care request created")
}

pub(super) fn accepted_care_request(service: &TestService) -> CareRequest {
    let request = pending_care_request(service, WALKER, PET, &monday_mornings());
    service
        .accept(&user(OWNER), &request.id)
        .expect("owner accepts")
        .request
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn care_router_with_service(service: TestService) -> axum::Router {
    care_router(Arc::new(service))
}

/// Store whose every call fails, standing in for a lost database connection.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl AvailabilityRepository for UnavailableStore {
    fn availability(&self, _caregiver: &UserId) -> Result<BTreeSet<WeeklySlot>, RepositoryError> {
        offline()
    }

    fn upsert_availability(
        &self,
        _caregiver: &UserId,
        _slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError> {
        offline()
    }

    fn delete_availability(
        &self,
        _caregiver: &UserId,
        _slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError> {
        offline()
    }
}

impl RequestRepository for UnavailableStore {
    fn insert_request(&self, _request: CareRequest) -> Result<CareRequest, RepositoryError> {
        offline()
    }

    fn fetch_request(&self, _id: &RequestId) -> Result<Option<CareRequest>, RepositoryError> {
        offline()
    }

    fn requests_sent_by(&self, _user: &UserId) -> Result<Vec<CareRequest>, RepositoryError> {
        offline()
    }

    fn requests_received_by(&self, _user: &UserId) -> Result<Vec<CareRequest>, RepositoryError> {
        offline()
    }

    fn update_status(
        &self,
        _id: &RequestId,
        _expected: RequestStatus,
        _next: RequestStatus,
        _at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError> {
        offline()
    }

    fn commit_acceptance(
        &self,
        _id: &RequestId,
        _walks: Vec<ScheduledWalk>,
        _at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError> {
        offline()
    }

    fn commit_cancellation(
        &self,
        _id: &RequestId,
        _at: DateTime<Utc>,
    ) -> Result<(CareRequest, usize), RepositoryError> {
        offline()
    }

    fn walks_for_caregiver(
        &self,
        _caregiver: &UserId,
    ) -> Result<Vec<ScheduledWalk>, RepositoryError> {
        offline()
    }

    fn walks_for_request(&self, _id: &RequestId) -> Result<Vec<ScheduledWalk>, RepositoryError> {
        offline()
    }

    fn has_accepted_care(
        &self,
        _caregiver: &UserId,
        _recipient: &UserId,
    ) -> Result<bool, RepositoryError> {
        offline()
    }

    fn delete_stale_requests(&self, _cutoff: DateTime<Utc>) -> Result<usize, RepositoryError> {
        offline()
    }
}

impl ReviewRepository for UnavailableStore {
    fn reviews_for(&self, _caregiver: &UserId) -> Result<Vec<CaregiverReview>, RepositoryError> {
        offline()
    }

    fn upsert_review(&self, _review: CaregiverReview) -> Result<(), RepositoryError> {
        offline()
    }
}
