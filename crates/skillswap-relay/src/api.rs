use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::call::CallBoard;
use crate::config::RelayConfig;
use crate::fanout::Notifier;
use crate::gatekeeper::Gatekeeper;
use crate::limiter::AdmissionLimiter;
use crate::registry::SessionRegistry;
use crate::router::RoomRouter;
use crate::ws;

/// Everything a request handler needs, constructed once in `main` and
/// cloned per request.  No module-level globals.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub router: RoomRouter,
    pub calls: CallBoard,
    pub notifier: Notifier,
    pub gatekeeper: Gatekeeper,
    pub limiter: AdmissionLimiter,
    pub config: Arc<RelayConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = match &state.config.client_origin {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any),
            Err(_) => {
                warn!(origin = %origin, "invalid CLIENT_ORIGIN, allowing any origin");
                permissive_cors()
            }
        },
        None => permissive_cors(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "starting relay HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
