use crate::cli::ServeArgs;
use crate::infra::{
    build_scorer, load_catalog, AppState, InMemoryProfileStore, InMemoryRecommendationStore,
    InMemorySchemeCatalog,
};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scheme_match::config::AppConfig;
use scheme_match::error::AppError;
use scheme_match::recommendations::RecommendationService;
use scheme_match::telemetry;
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

    let catalog = InMemorySchemeCatalog::new(load_catalog(args.catalog.as_deref())?);
    let scheme_count = catalog.len();
    let profiles = InMemoryProfileStore::default();
    let service = Arc::new(RecommendationService::new(
        Arc::new(profiles.clone()),
        Arc::new(catalog),
        Arc::new(InMemoryRecommendationStore::default()),
        build_scorer(&config.ai),
    ));

    let app = with_platform_routes(service, profiles)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        schemes = scheme_count,
        ai = config.ai.enabled(),
        "scheme recommendation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
