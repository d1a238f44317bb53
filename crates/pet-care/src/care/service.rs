use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::directory::Directory;
use super::domain::{
    validate_slots, CaregiverReview, PetId, PetSet, Rating, RequestId, RequestKind,
    ScheduledWalk, SlotInput, UserId, WeeklySlot,
};
use super::error::CareError;
use super::reconciler::{CaregiverCalendar, ScheduleReconciler};
use super::repository::{CareStore, RepositoryError};
use super::requests::{
    dedupe_agreement, CareRequest, Mailbox, Party, RequestAction, RequestStatus,
    RequestSubmission,
};
use super::reviews::{ReviewAggregator, ReviewSummary};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> RequestId {
    let id = REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RequestId(format!("req-{id:06}"))
}

/// Result of accepting a request: the updated row plus any walks it booked.
#[derive(Debug, Clone, Serialize)]
pub struct Acceptance {
    pub request: CareRequest,
    pub walks: Vec<ScheduledWalk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub request: CareRequest,
    pub released_walks: usize,
}

/// Facade over availability, the request lifecycle, reconciliation, and reviews.
///
/// Every operation takes the acting user explicitly.
pub struct CareService<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    reconciler: ScheduleReconciler,
    aggregator: ReviewAggregator,
}

impl<S, D> CareService<S, D>
where
    S: CareStore + 'static,
    D: Directory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self {
            store,
            directory,
            reconciler: ScheduleReconciler::new(),
            aggregator: ReviewAggregator::new(),
        }
    }

    /// Open weekly slots for `caregiver`, Monday first.
    pub fn availability(&self, caregiver: &UserId) -> Result<Vec<WeeklySlot>, CareError> {
        Ok(self.store.availability(caregiver)?.into_iter().collect())
    }

    /// Declare slots open. Re-declaring an open slot is a no-op.
    pub fn put_availability(
        &self,
        actor: &UserId,
        caregiver: &UserId,
        slots: &[SlotInput],
    ) -> Result<Vec<WeeklySlot>, CareError> {
        self.ensure_calendar_owner(actor, caregiver)?;
        let slots = validate_slots(slots)?;
        let added = self.store.upsert_availability(caregiver, &slots)?;
        info!(caregiver = %caregiver, requested = slots.len(), added, "availability opened");
        self.availability(caregiver)
    }

    /// Close slots. Closing a slot that is not open is a no-op.
    pub fn delete_availability(
        &self,
        actor: &UserId,
        caregiver: &UserId,
        slots: &[SlotInput],
    ) -> Result<Vec<WeeklySlot>, CareError> {
        self.ensure_calendar_owner(actor, caregiver)?;
        let slots = validate_slots(slots)?;
        let removed = self.store.delete_availability(caregiver, &slots)?;
        info!(caregiver = %caregiver, requested = slots.len(), removed, "availability closed");
        self.availability(caregiver)
    }

    fn ensure_calendar_owner(&self, actor: &UserId, caregiver: &UserId) -> Result<(), CareError> {
        if actor != caregiver {
            return Err(CareError::Forbidden(
                "availability can only be changed by its caregiver",
            ));
        }
        if !self.directory.is_caregiver(actor)? {
            return Err(CareError::Forbidden("user is not a caregiver"));
        }
        Ok(())
    }

    /// Submit an adoption or care request for `pet` on behalf of `actor`.
    pub fn create_request(
        &self,
        actor: &UserId,
        pet: &PetId,
        submission: RequestSubmission,
    ) -> Result<CareRequest, CareError> {
        let kind: RequestKind = submission.kind.parse()?;
        let receiver = self
            .directory
            .pet_owner(pet)?
            .ok_or_else(|| CareError::NoOwner(pet.to_string()))?;
        if &receiver == actor {
            return Err(CareError::Forbidden("cannot send a request for your own pet"));
        }

        let agreement = match kind {
            RequestKind::Adopt => Vec::new(),
            RequestKind::Care => {
                if !self.directory.is_caregiver(actor)? {
                    return Err(CareError::Forbidden("only caregivers can offer care"));
                }
                let agreement = dedupe_agreement(validate_slots(&submission.slots)?);
                if agreement.is_empty() {
                    return Err(CareError::EmptyAgreement);
                }
                agreement
            }
        };

        let message = submission
            .message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());
        let now = Utc::now();
        let request = CareRequest {
            id: next_request_id(),
            sender_id: actor.clone(),
            receiver_id: receiver,
            pets: PetSet::single(pet.clone()),
            kind,
            message,
            status: RequestStatus::Pending,
            agreement,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_request(request)?;
        info!(
            request_id = %stored.id,
            kind = %stored.kind,
            sender = %stored.sender_id,
            receiver = %stored.receiver_id,
            slots = stored.agreement.len(),
            "request created"
        );
        Ok(stored)
    }

    /// Fetch a request visible to `actor`.
    pub fn request(&self, actor: &UserId, id: &RequestId) -> Result<CareRequest, CareError> {
        let request = self.load(id)?;
        if request.party(actor) == Party::Outsider {
            return Err(CareError::Forbidden("only the parties can view a request"));
        }
        Ok(request)
    }

    pub fn requests(&self, actor: &UserId, mailbox: Mailbox) -> Result<Vec<CareRequest>, CareError> {
        let requests = match mailbox {
            Mailbox::Sent => self.store.requests_sent_by(actor)?,
            Mailbox::Received => self.store.requests_received_by(actor)?,
        };
        Ok(requests)
    }

    /// Accept a pending request. Care requests are reconciled into walks in the
    /// same unit; on any failure the request stays pending.
    pub fn accept(&self, actor: &UserId, id: &RequestId) -> Result<Acceptance, CareError> {
        let request = self.load(id)?;
        let next = request.transition(actor, RequestAction::Accept)?;

        let Some(caregiver) = request.caregiver() else {
            let accepted = self
                .store
                .update_status(&request.id, request.status, next, Utc::now())
                .map_err(|err| status_error(&request, RequestAction::Accept, err))?;
            info!(request_id = %accepted.id, kind = %accepted.kind, "request accepted");
            return Ok(Acceptance {
                request: accepted,
                walks: Vec::new(),
            });
        };

        let availability = self.store.availability(caregiver)?;
        let booked = self.store.walks_for_caregiver(caregiver)?;
        let walks = self
            .reconciler
            .plan(
                &request,
                CaregiverCalendar {
                    caregiver,
                    availability: &availability,
                    booked: &booked,
                },
            )
            .inspect_err(|err| log_reconcile_failure(&request, err))?;

        let accepted = self
            .store
            .commit_acceptance(&request.id, walks.clone(), Utc::now())
            .map_err(|err| self.reconciler.translate_commit_error(&request, err))
            .inspect_err(|err| log_reconcile_failure(&request, err))?;

        info!(
            request_id = %accepted.id,
            caregiver = %caregiver,
            walks = walks.len(),
            "care request accepted"
        );
        Ok(Acceptance {
            request: accepted,
            walks,
        })
    }

    pub fn reject(&self, actor: &UserId, id: &RequestId) -> Result<CareRequest, CareError> {
        let request = self.load(id)?;
        let next = request.transition(actor, RequestAction::Reject)?;
        let rejected = self
            .store
            .update_status(&request.id, request.status, next, Utc::now())
            .map_err(|err| status_error(&request, RequestAction::Reject, err))?;
        info!(request_id = %rejected.id, kind = %rejected.kind, "request rejected");
        Ok(rejected)
    }

    /// Cancel an accepted care request, releasing its walks in the same unit.
    pub fn cancel(&self, actor: &UserId, id: &RequestId) -> Result<Cancellation, CareError> {
        let request = self.load(id)?;
        request.transition(actor, RequestAction::Cancel)?;
        let (cancelled, released_walks) = self
            .store
            .commit_cancellation(&request.id, Utc::now())
            .map_err(|err| status_error(&request, RequestAction::Cancel, err))?;
        info!(
            request_id = %cancelled.id,
            cancelled_by = %actor,
            released_walks,
            "care request cancelled"
        );
        Ok(Cancellation {
            request: cancelled,
            released_walks,
        })
    }

    pub fn scheduled_walks(&self, caregiver: &UserId) -> Result<Vec<ScheduledWalk>, CareError> {
        Ok(self.store.walks_for_caregiver(caregiver)?)
    }

    /// Rating summary for `caregiver`, including the viewer's own rating when present.
    pub fn review_summary(
        &self,
        caregiver: &UserId,
        viewer: Option<&UserId>,
    ) -> Result<ReviewSummary, CareError> {
        let reviews = self.store.reviews_for(caregiver)?;
        Ok(self.aggregator.summarize(caregiver, viewer, &reviews))
    }

    /// A viewer may rate a caregiver once that caregiver's care offer for one
    /// of the viewer's pets has been accepted.
    pub fn can_review(&self, viewer: &UserId, caregiver: &UserId) -> Result<bool, CareError> {
        if viewer == caregiver {
            return Ok(false);
        }
        Ok(self.store.has_accepted_care(caregiver, viewer)?)
    }

    pub fn submit_rating(
        &self,
        viewer: &UserId,
        caregiver: &UserId,
        rating: i64,
    ) -> Result<ReviewSummary, CareError> {
        if !self.can_review(viewer, caregiver)? {
            return Err(CareError::NotEligible);
        }
        let rating = Rating::new(rating)?;

        self.store.upsert_review(CaregiverReview {
            reviewer_id: viewer.clone(),
            caregiver_id: caregiver.clone(),
            rating,
            reviewed_at: Utc::now(),
        })?;
        info!(reviewer = %viewer, caregiver = %caregiver, rating = rating.value(), "rating recorded");

        self.review_summary(caregiver, Some(viewer))
    }

    fn load(&self, id: &RequestId) -> Result<CareRequest, CareError> {
        self.store
            .fetch_request(id)?
            .ok_or_else(|| CareError::request_not_found(id))
    }
}

fn status_error(request: &CareRequest, action: RequestAction, error: RepositoryError) -> CareError {
    match error {
        RepositoryError::StaleStatus { found } => CareError::InvalidTransition {
            from: found,
            action,
        },
        RepositoryError::NotFound => CareError::request_not_found(&request.id),
        other => CareError::Repository(other),
    }
}

fn log_reconcile_failure(request: &CareRequest, error: &CareError) {
    warn!(
        request_id = %request.id,
        sender = %request.sender_id,
        error = %error,
        "care request could not be reconciled"
    );
}
