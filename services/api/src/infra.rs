use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use pet_care::care::{InMemoryDirectory, ReclamationJob, RequestRepository};
use pet_care::config::CareConfig;
use pet_care::error::AppError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Seeded directory when `CARE_DIRECTORY_SEED` is set, otherwise an empty one.
pub(crate) fn load_directory(config: &CareConfig) -> Result<InMemoryDirectory, AppError> {
    match &config.directory_seed {
        Some(path) => {
            let directory = InMemoryDirectory::from_seed_file(path)?;
            info!(seed = %path.display(), "directory seeded");
            Ok(directory)
        }
        None => {
            warn!("CARE_DIRECTORY_SEED not set; no pets or caregivers are known");
            Ok(InMemoryDirectory::new())
        }
    }
}

/// Run the stale request sweep on a fixed period, off the request path.
pub(crate) fn spawn_reclamation<R>(job: ReclamationJob<R>, period: Duration) -> JoinHandle<()>
where
    R: RequestRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = job.run_once(Utc::now()) {
                warn!(error = %err, "stale request sweep failed");
            }
        }
    })
}
