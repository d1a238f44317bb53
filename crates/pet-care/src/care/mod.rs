//! Care scheduling and request lifecycle.
//!
//! Caregivers publish a recurring weekly availability template, users send
//! adoption or care requests over a pet, and accepting a care request books
//! its proposed slots as scheduled walks without double-booking the
//! caregiver. Owners who received accepted care may rate the caregiver.

pub mod directory;
pub mod domain;
pub mod error;
pub mod memory;
pub mod reclamation;
pub mod reconciler;
pub mod repository;
pub mod requests;
pub mod reviews;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use directory::{Directory, DirectoryError, DirectorySeed, InMemoryDirectory, PetSeed};
pub use domain::{
    CaregiverReview, DayOfWeek, PetId, PetSet, Rating, RequestId, RequestKind, ScheduledWalk,
    SlotInput, TimeSlot, UserId, WalkId, WeeklySlot,
};
pub use error::CareError;
pub use memory::InMemoryCareStore;
pub use reclamation::{ReclamationJob, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
pub use reconciler::{CaregiverCalendar, ScheduleReconciler};
pub use repository::{
    AvailabilityRepository, CareStore, RepositoryError, RequestRepository, ReviewRepository,
};
pub use requests::{CareRequest, Mailbox, RequestAction, RequestStatus, RequestSubmission};
pub use reviews::{ReviewAggregator, ReviewSummary};
pub use router::{care_router, status_for, ACTOR_HEADER};
pub use service::{Acceptance, CareService, Cancellation};
