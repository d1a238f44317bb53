use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{CaregiverReview, RequestId, ScheduledWalk, UserId, WeeklySlot};
use super::requests::{CareRequest, RequestStatus};

/// Weekly availability template per caregiver.
pub trait AvailabilityRepository: Send + Sync {
    fn availability(&self, caregiver: &UserId) -> Result<BTreeSet<WeeklySlot>, RepositoryError>;
    /// Insert each slot unless already present. Returns how many rows were new.
    fn upsert_availability(
        &self,
        caregiver: &UserId,
        slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError>;
    /// Remove exactly the given slots. Returns how many rows existed.
    fn delete_availability(
        &self,
        caregiver: &UserId,
        slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError>;
}

/// Requests, their pet attachments, and the scheduled walks they produce.
pub trait RequestRepository: Send + Sync {
    fn insert_request(&self, request: CareRequest) -> Result<CareRequest, RepositoryError>;
    fn fetch_request(&self, id: &RequestId) -> Result<Option<CareRequest>, RepositoryError>;
    fn requests_sent_by(&self, user: &UserId) -> Result<Vec<CareRequest>, RepositoryError>;
    fn requests_received_by(&self, user: &UserId) -> Result<Vec<CareRequest>, RepositoryError>;

    /// Compare-and-set the status of a request.
    ///
    /// Fails with `StaleStatus` when the stored status no longer equals
    /// `expected`.
    fn update_status(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError>;

    /// Move a pending request to accepted and insert its walks as one unit.
    ///
    /// Every walk's slot must still be open on its caregiver's calendar
    /// (`SlotClosed` otherwise), and the `(caregiver, day, time)` unique index
    /// is checked for every walk (`UniqueViolation`). Both checks run before
    /// anything is written, so a failure leaves storage untouched.
    fn commit_acceptance(
        &self,
        id: &RequestId,
        walks: Vec<ScheduledWalk>,
        at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError>;

    /// Move an accepted request to cancelled and drop its walks as one unit.
    /// Returns the updated request and the number of walks removed.
    fn commit_cancellation(
        &self,
        id: &RequestId,
        at: DateTime<Utc>,
    ) -> Result<(CareRequest, usize), RepositoryError>;

    fn walks_for_caregiver(&self, caregiver: &UserId)
        -> Result<Vec<ScheduledWalk>, RepositoryError>;
    fn walks_for_request(&self, id: &RequestId) -> Result<Vec<ScheduledWalk>, RepositoryError>;

    /// Whether an accepted care request exists with `caregiver` as sender and
    /// `recipient` as receiver.
    fn has_accepted_care(
        &self,
        caregiver: &UserId,
        recipient: &UserId,
    ) -> Result<bool, RepositoryError>;

    /// Delete every request that is not accepted and was created before
    /// `cutoff`. Returns the number of rows deleted.
    fn delete_stale_requests(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

pub trait ReviewRepository: Send + Sync {
    fn reviews_for(&self, caregiver: &UserId) -> Result<Vec<CaregiverReview>, RepositoryError>;
    /// Insert or overwrite the row keyed by `(reviewer_id, caregiver_id)`.
    fn upsert_review(&self, review: CaregiverReview) -> Result<(), RepositoryError>;
}

/// Everything the care service needs from storage.
pub trait CareStore: AvailabilityRepository + RequestRepository + ReviewRepository {}

impl<T> CareStore for T where T: AvailabilityRepository + RequestRepository + ReviewRepository {}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("request status changed concurrently (found {found})")]
    StaleStatus { found: RequestStatus },
    #[error("caregiver slot {slot} is no longer open")]
    SlotClosed { slot: WeeklySlot },
    #[error("unique constraint violated for caregiver slot {slot}")]
    UniqueViolation { slot: WeeklySlot },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
