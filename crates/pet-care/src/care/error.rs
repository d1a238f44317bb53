use super::directory::DirectoryError;
use super::domain::{RequestId, WeeklySlot};
use super::repository::RepositoryError;
use super::requests::{RequestAction, RequestStatus};

/// Failures surfaced by the care scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("cannot {action} a request that is {from}")]
    InvalidTransition {
        from: RequestStatus,
        action: RequestAction,
    },
    #[error("time slot '{0}' is not a quarter-hour HH:MM value")]
    InvalidSlot(String),
    #[error("rating {0} is outside 1..=5")]
    InvalidRating(i64),
    #[error("request type '{0}' is not one of adopt, care")]
    InvalidType(String),
    #[error("care requests must propose at least one slot")]
    EmptyAgreement,
    #[error("caregiver is not available on {0}")]
    SlotNotAvailable(WeeklySlot),
    #[error("caregiver is already booked on {0}")]
    SlotConflict(WeeklySlot),
    #[error("viewer has not received accepted care from this caregiver")]
    NotEligible,
    #[error("{0} not found")]
    NotFound(String),
    #[error("pet {0} has no owner")]
    NoOwner(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl CareError {
    pub(crate) fn request_not_found(id: &RequestId) -> Self {
        CareError::NotFound(format!("request {id}"))
    }

    /// Stable machine readable tag for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            CareError::Forbidden(_) => "forbidden",
            CareError::InvalidTransition { .. } => "invalid_transition",
            CareError::InvalidSlot(_) => "invalid_slot",
            CareError::InvalidRating(_) => "invalid_rating",
            CareError::InvalidType(_) => "invalid_type",
            CareError::EmptyAgreement => "empty_agreement",
            CareError::SlotNotAvailable(_) => "slot_not_available",
            CareError::SlotConflict(_) => "slot_conflict",
            CareError::NotEligible => "not_eligible",
            CareError::NotFound(_) => "not_found",
            CareError::NoOwner(_) => "no_owner",
            CareError::Repository(_) => "repository_unavailable",
            CareError::Directory(_) => "directory_unavailable",
        }
    }
}
