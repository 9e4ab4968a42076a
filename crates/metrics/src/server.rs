//! `/metrics` endpoint serving the generated exposition file

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub metrics_path: PathBuf,
}

/// Build the router. The file is read on every request so a regenerated
/// report shows up without a restart.
pub fn router(cfg: MetricsServerConfig) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(Arc::new(cfg))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(addr: SocketAddr, cfg: MetricsServerConfig) -> anyhow::Result<()> {
    info!("Metrics server running at http://{}/metrics", addr);
    info!("Serving {}", cfg.metrics_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(cfg)).await?;

    Ok(())
}

async fn metrics_handler(State(cfg): State<Arc<MetricsServerConfig>>) -> Response {
    match tokio::fs::read_to_string(&cfg.metrics_path).await {
        Ok(body) => ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            warn!("Metrics file {} unavailable: {}", cfg.metrics_path.display(), e);
            (
                StatusCode::NOT_FOUND,
                "Metrics file not found. Run `playtype-metrics generate` first.",
            )
                .into_response()
        }
    }
}
