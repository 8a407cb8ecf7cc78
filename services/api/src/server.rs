use crate::cli::ServeArgs;
use crate::infra::{memory_gateway, AppState};
use crate::routes::with_inventory_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use goods_receipt::config::AppConfig;
use goods_receipt::error::AppError;
use goods_receipt::telemetry;
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
        unit_options: Arc::new(config.receiving.unit_options.clone()),
    };

    let app = with_inventory_routes(memory_gateway())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        units = ?config.receiving.unit_options,
        "goods receipt service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
