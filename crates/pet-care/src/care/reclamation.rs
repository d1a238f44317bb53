use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::repository::{RepositoryError, RequestRepository};

pub const DEFAULT_RETENTION_DAYS: u32 = 7;
/// Upper bound on retention, roughly a century.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Out-of-band sweep deleting requests that never got accepted.
///
/// Safe to run repeatedly; a second run with the same `now` deletes nothing.
pub struct ReclamationJob<R> {
    repository: Arc<R>,
    retention: Duration,
}

impl<R> ReclamationJob<R>
where
    R: RequestRepository + 'static,
{
    pub fn new(repository: Arc<R>, retention_days: u32) -> Self {
        Self {
            repository,
            retention: Duration::days(i64::from(retention_days.clamp(1, MAX_RETENTION_DAYS))),
        }
    }

    /// Oldest creation time a non-accepted request may have and survive.
    /// Saturates at the earliest representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.retention).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn run_once(&self, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let cutoff = self.cutoff(now);
        let deleted = self.repository.delete_stale_requests(cutoff)?;
        info!(%cutoff, deleted, "stale request sweep finished");
        Ok(deleted)
    }
}

impl<R> Clone for ReclamationJob<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            retention: self.retention,
        }
    }
}
