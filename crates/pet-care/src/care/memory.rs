//! In-memory implementation of the care repositories.
//!
//! All relations live behind a single mutex, so each trait method runs as one
//! serializable transaction. The walk index plays the part of the
//! `(caregiver_id, day_of_week, time_slot)` unique constraint.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    CaregiverReview, RequestId, RequestKind, ScheduledWalk, UserId, WalkId, WeeklySlot,
};
use super::repository::{
    AvailabilityRepository, RepositoryError, RequestRepository, ReviewRepository,
};
use super::requests::{CareRequest, RequestStatus};

#[derive(Debug, Default)]
struct Tables {
    availability: BTreeMap<UserId, BTreeSet<WeeklySlot>>,
    requests: BTreeMap<RequestId, CareRequest>,
    walks: BTreeMap<WalkId, ScheduledWalk>,
    walk_index: HashMap<(UserId, WeeklySlot), WalkId>,
    reviews: BTreeMap<(UserId, UserId), CaregiverReview>,
}

impl Tables {
    fn remove_walks_of(&mut self, request_id: &RequestId) -> usize {
        let doomed: Vec<WalkId> = self
            .walks
            .values()
            .filter(|walk| &walk.request_id == request_id)
            .map(|walk| walk.id.clone())
            .collect();

        for id in &doomed {
            if let Some(walk) = self.walks.remove(id) {
                self.walk_index
                    .remove(&(walk.caregiver_id.clone(), walk.slot()));
            }
        }
        doomed.len()
    }
}

/// Store shared by the API binary, the demo, and tests.
#[derive(Debug, Default)]
pub struct InMemoryCareStore {
    tables: Mutex<Tables>,
}

impl InMemoryCareStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("care store mutex poisoned".to_string()))
    }

    /// Number of walks currently committed, across all caregivers.
    pub fn walk_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.walks.len())
    }
}

fn newest_first(mut requests: Vec<CareRequest>) -> Vec<CareRequest> {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    requests
}

impl AvailabilityRepository for InMemoryCareStore {
    fn availability(&self, caregiver: &UserId) -> Result<BTreeSet<WeeklySlot>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .availability
            .get(caregiver)
            .cloned()
            .unwrap_or_default())
    }

    fn upsert_availability(
        &self,
        caregiver: &UserId,
        slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError> {
        let mut tables = self.lock()?;
        let entry = tables.availability.entry(caregiver.clone()).or_default();
        Ok(slots.iter().filter(|slot| entry.insert(**slot)).count())
    }

    fn delete_availability(
        &self,
        caregiver: &UserId,
        slots: &[WeeklySlot],
    ) -> Result<usize, RepositoryError> {
        let mut tables = self.lock()?;
        let Some(entry) = tables.availability.get_mut(caregiver) else {
            return Ok(0);
        };
        let removed = slots.iter().filter(|slot| entry.remove(*slot)).count();
        if entry.is_empty() {
            tables.availability.remove(caregiver);
        }
        Ok(removed)
    }
}

impl RequestRepository for InMemoryCareStore {
    fn insert_request(&self, request: CareRequest) -> Result<CareRequest, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch_request(&self, id: &RequestId) -> Result<Option<CareRequest>, RepositoryError> {
        Ok(self.lock()?.requests.get(id).cloned())
    }

    fn requests_sent_by(&self, user: &UserId) -> Result<Vec<CareRequest>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .requests
                .values()
                .filter(|request| &request.sender_id == user)
                .cloned()
                .collect(),
        ))
    }

    fn requests_received_by(&self, user: &UserId) -> Result<Vec<CareRequest>, RepositoryError> {
        let tables = self.lock()?;
        Ok(newest_first(
            tables
                .requests
                .values()
                .filter(|request| &request.receiver_id == user)
                .cloned()
                .collect(),
        ))
    }

    fn update_status(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError> {
        let mut tables = self.lock()?;
        let request = tables
            .requests
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if request.status != expected {
            return Err(RepositoryError::StaleStatus {
                found: request.status,
            });
        }
        request.status = next;
        request.updated_at = at;
        Ok(request.clone())
    }

    fn commit_acceptance(
        &self,
        id: &RequestId,
        walks: Vec<ScheduledWalk>,
        at: DateTime<Utc>,
    ) -> Result<CareRequest, RepositoryError> {
        let mut tables = self.lock()?;
        let status = tables
            .requests
            .get(id)
            .map(|request| request.status)
            .ok_or(RepositoryError::NotFound)?;
        if status != RequestStatus::Pending {
            return Err(RepositoryError::StaleStatus { found: status });
        }

        if let Some(closed) = walks.iter().find(|walk| {
            !tables
                .availability
                .get(&walk.caregiver_id)
                .is_some_and(|open| open.contains(&walk.slot()))
        }) {
            return Err(RepositoryError::SlotClosed { slot: closed.slot() });
        }

        let mut claimed = BTreeSet::new();
        for walk in &walks {
            let key = (walk.caregiver_id.clone(), walk.slot());
            if tables.walk_index.contains_key(&key) || !claimed.insert(key) {
                return Err(RepositoryError::UniqueViolation { slot: walk.slot() });
            }
        }

        for walk in walks {
            tables
                .walk_index
                .insert((walk.caregiver_id.clone(), walk.slot()), walk.id.clone());
            tables.walks.insert(walk.id.clone(), walk);
        }

        let request = tables
            .requests
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = RequestStatus::Accepted;
        request.updated_at = at;
        Ok(request.clone())
    }

    fn commit_cancellation(
        &self,
        id: &RequestId,
        at: DateTime<Utc>,
    ) -> Result<(CareRequest, usize), RepositoryError> {
        let mut tables = self.lock()?;
        let status = tables
            .requests
            .get(id)
            .map(|request| request.status)
            .ok_or(RepositoryError::NotFound)?;
        if status != RequestStatus::Accepted {
            return Err(RepositoryError::StaleStatus { found: status });
        }

        let removed = tables.remove_walks_of(id);
        let request = tables
            .requests
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = RequestStatus::Cancelled;
        request.updated_at = at;
        Ok((request.clone(), removed))
    }

    fn walks_for_caregiver(
        &self,
        caregiver: &UserId,
    ) -> Result<Vec<ScheduledWalk>, RepositoryError> {
        let tables = self.lock()?;
        let mut walks: Vec<ScheduledWalk> = tables
            .walks
            .values()
            .filter(|walk| &walk.caregiver_id == caregiver)
            .cloned()
            .collect();
        walks.sort_by_key(ScheduledWalk::slot);
        Ok(walks)
    }

    fn walks_for_request(&self, id: &RequestId) -> Result<Vec<ScheduledWalk>, RepositoryError> {
        let tables = self.lock()?;
        let mut walks: Vec<ScheduledWalk> = tables
            .walks
            .values()
            .filter(|walk| &walk.request_id == id)
            .cloned()
            .collect();
        walks.sort_by_key(ScheduledWalk::slot);
        Ok(walks)
    }

    fn has_accepted_care(
        &self,
        caregiver: &UserId,
        recipient: &UserId,
    ) -> Result<bool, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables.requests.values().any(|request| {
            request.kind == RequestKind::Care
                && request.status == RequestStatus::Accepted
                && &request.sender_id == caregiver
                && &request.receiver_id == recipient
        }))
    }

    fn delete_stale_requests(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let mut tables = self.lock()?;
        let stale: Vec<RequestId> = tables
            .requests
            .values()
            .filter(|request| {
                request.status != RequestStatus::Accepted && request.created_at < cutoff
            })
            .map(|request| request.id.clone())
            .collect();

        for id in &stale {
            tables.remove_walks_of(id);
            tables.requests.remove(id);
        }
        Ok(stale.len())
    }
}

impl ReviewRepository for InMemoryCareStore {
    fn reviews_for(&self, caregiver: &UserId) -> Result<Vec<CaregiverReview>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .reviews
            .values()
            .filter(|review| &review.caregiver_id == caregiver)
            .cloned()
            .collect())
    }

    fn upsert_review(&self, review: CaregiverReview) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.reviews.insert(
            (review.reviewer_id.clone(), review.caregiver_id.clone()),
            review,
        );
        Ok(())
    }
}
