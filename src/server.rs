use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_derive::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handle::{PostGenerator, Reply};
use crate::types::Source;

/// Larger bodies are refused with a JSON 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mode: Source,
}

/// `/` and `/generate-post` accept every method so the dispatcher owns the
/// 405 response.
pub fn router(service: Arc<PostGenerator>) -> Router {
    Router::new()
        .route("/", any(generate_post))
        .route("/generate-post", any(generate_post))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn generate_post(
    State(service): State<Arc<PostGenerator>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("couldn't read request body: {}", rejection.body_text());
            let reply = Reply::error(rejection.status(), rejection.body_text());
            return (reply.status, reply.headers, reply.body).into_response();
        }
    };
    let body = String::from_utf8_lossy(&body);
    let reply = service.dispatch(method.as_str(), Some(body.as_ref())).await;
    (reply.status, reply.headers, reply.body).into_response()
}

async fn health(State(service): State<Arc<PostGenerator>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: service.mode(),
    })
}

pub async fn serve(addr: SocketAddr, service: Arc<PostGenerator>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "listening on {} ({:?} mode, platforms: {:?})",
        listener.local_addr()?,
        service.mode(),
        service.catalog().supported()
    );
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => {
            warn!("can't listen for ctrl-c: {}", e);
            std::future::pending::<()>().await
        }
    }
}
