//! Turns an accepted care request's proposed slots into scheduled walks.
//!
//! Planning is pure: it checks the agreement against a snapshot of the
//! caregiver's availability and existing walks. The snapshot can go stale
//! between planning and commit, so storage re-checks availability and the
//! slot unique index inside the acceptance transaction and has the final word.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::{ScheduledWalk, UserId, WalkId, WeeklySlot};
use super::error::CareError;
use super::repository::RepositoryError;
use super::requests::{CareRequest, RequestAction};

static WALK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_walk_id() -> WalkId {
    let id = WALK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    WalkId(format!("walk-{id:06}"))
}

/// Caregiver state the plan is validated against.
#[derive(Debug, Clone, Copy)]
pub struct CaregiverCalendar<'a> {
    pub caregiver: &'a UserId,
    pub availability: &'a BTreeSet<WeeklySlot>,
    pub booked: &'a [ScheduledWalk],
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduleReconciler;

impl ScheduleReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Produce one walk per proposed slot, or the first reason none can be made.
    pub fn plan(
        &self,
        request: &CareRequest,
        calendar: CaregiverCalendar<'_>,
    ) -> Result<Vec<ScheduledWalk>, CareError> {
        if request.agreement.is_empty() {
            return Err(CareError::EmptyAgreement);
        }

        if let Some(missing) = request
            .agreement
            .iter()
            .find(|slot| !calendar.availability.contains(*slot))
        {
            return Err(CareError::SlotNotAvailable(*missing));
        }

        let occupied: HashSet<WeeklySlot> = calendar
            .booked
            .iter()
            .filter(|walk| {
                &walk.caregiver_id == calendar.caregiver && walk.request_id != request.id
            })
            .map(ScheduledWalk::slot)
            .collect();
        if let Some(taken) = request
            .agreement
            .iter()
            .find(|slot| occupied.contains(*slot))
        {
            return Err(CareError::SlotConflict(*taken));
        }

        Ok(request
            .agreement
            .iter()
            .map(|slot| ScheduledWalk {
                id: next_walk_id(),
                request_id: request.id.clone(),
                caregiver_id: calendar.caregiver.clone(),
                pet_id: request.pet().clone(),
                day: slot.day,
                time: slot.time,
            })
            .collect())
    }

    /// Map storage failures from the acceptance commit onto reconciliation errors.
    pub fn translate_commit_error(
        &self,
        request: &CareRequest,
        error: RepositoryError,
    ) -> CareError {
        match error {
            RepositoryError::SlotClosed { slot } => CareError::SlotNotAvailable(slot),
            RepositoryError::UniqueViolation { slot } => CareError::SlotConflict(slot),
            RepositoryError::StaleStatus { found } => CareError::InvalidTransition {
                from: found,
                action: RequestAction::Accept,
            },
            RepositoryError::NotFound => CareError::request_not_found(&request.id),
            other => CareError::Repository(other),
        }
    }
}
