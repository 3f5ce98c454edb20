use crate::cli::ServeArgs;
use crate::infra::{build_wizard, AppState};
use crate::routes::with_wizard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ccne_report::config::AppConfig;
use ccne_report::error::AppError;
use ccne_report::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(dir) = args.snapshot_dir.take() {
        config.wizard.snapshot_dir = Some(dir);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let stack = build_wizard(&config.wizard);
    let _flush_loop = stack.service.spawn_flush_loop(FLUSH_POLL_INTERVAL);

    let app = with_wizard_routes(&stack)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "report wizard ready");

    axum::serve(listener, app).await?;
    stack.service.flush();
    Ok(())
}
