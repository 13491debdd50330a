use crate::cli::ServeArgs;
use crate::infra::{load_catalog_file, portal_settings, seed_catalog, AppState};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use scholar_match::config::AppConfig;
use scholar_match::error::AppError;
use scholar_match::llm::ChatCompletionsClient;
use scholar_match::portal::{InMemoryStore, Portal, Repositories};
use scholar_match::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    if config.llm.api_key.is_none() {
        warn!("LLM_API_KEY is not set; ingestion and writing assistance will answer 503");
    }
    let model = Arc::new(ChatCompletionsClient::new(&config.llm)?);
    let portal = Arc::new(Portal::new(
        Repositories::in_memory(InMemoryStore::new()),
        model,
        portal_settings(&config),
    ));

    if let Some(seed) = args.seed.take() {
        let loaded = seed_catalog(&portal.catalog, load_catalog_file(&seed)?, Utc::now())?;
        info!(path = %seed.display(), loaded, "catalog seeded");
    }

    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, model = %config.llm.model, "scholarship portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
