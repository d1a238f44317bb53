use crate::cli::ServeArgs;
use crate::infra::{load_directory, spawn_reclamation, AppState};
use crate::routes::with_care_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pet_care::care::{CareService, InMemoryCareStore, ReclamationJob};
use pet_care::config::AppConfig;
use pet_care::error::AppError;
use pet_care::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryCareStore::new());
    let directory = Arc::new(load_directory(&config.care)?);
    let care_service = Arc::new(CareService::new(store.clone(), directory));

    let reclamation = ReclamationJob::new(store, config.care.retention_days);
    let _sweeper = spawn_reclamation(reclamation, config.care.reclaim_interval());

    let app = with_care_routes(care_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        retention_days = config.care.retention_days,
        "pet care scheduler ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
