//! HTTP surface: `POST /process` and a liveness route.
//!
//! Status mapping:
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | malformed body, missing field, empty instructions | 400 | `{"error": "Invalid request: …"}` |
//! | body larger than the configured limit | 413 | `{"error": …}` |
//! | processed successfully | 200 | success [`ProcessResponse`] |
//! | processing failed | 500 | failure [`ProcessResponse`] |
//! | handler panicked | 500 | `{"error": "Internal error: …"}` |

use crate::error::DocProcError;
use crate::output::ProcessResponse;
use crate::process::DocumentProcessor;
use crate::request::ProcessRequest;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Default request body cap: base64 inflates documents by a third.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Liveness message returned by `GET /`.
pub const HEALTH_MESSAGE: &str = "Document Processor API is running";

impl IntoResponse for DocProcError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for ProcessResponse {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(self)).into_response()
    }
}

/// Build the application router.
pub fn router(processor: DocumentProcessor, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([Method::OPTIONS, Method::POST]);

    Router::new()
        .route("/", get(health_handler))
        .route("/process", post(process_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(processor)
}

/// Turn a panic inside a handler into a JSON 500 instead of a dropped
/// connection.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!("Request handler panicked: {}", detail);
    DocProcError::Internal("request handler panicked".into()).into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "message": HEALTH_MESSAGE }))
}

async fn process_handler(
    State(processor): State<DocumentProcessor>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                return (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(json!({ "error": rejection.body_text() })),
                )
                    .into_response();
            }
            return DocProcError::InvalidRequest(rejection.body_text()).into_response();
        }
    };

    if let Err(e) = request.validate() {
        warn!("Rejected request: {}", e);
        return e.into_response();
    }

    processor.process(request).await.into_response()
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(
    processor: DocumentProcessor,
    addr: SocketAddr,
    body_limit: usize,
) -> std::io::Result<()> {
    let app = router(processor, body_limit);
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
