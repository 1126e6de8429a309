//! Inbound HTTP API.
//!
//! | Method | Path           | Response                                   |
//! |--------|----------------|--------------------------------------------|
//! | POST   | `/api/analyze` | 200 [`AnalysisReport`], 400 `{error}`      |
//! | other  | `/api/analyze` | 405 `{error}`                              |
//! | GET    | `/health`      | 200 `{status: "ok"}`                       |
//!
//! CORS preflight (`OPTIONS`) is answered by the CORS layer. Bodies over the
//! configured limit are refused by the `Bytes` extractor, so the 413 carries
//! the same `{error}` document as every other failure.

use std::any::Any;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::analysis::{AnalysisReport, Analyzer, RequestError};
use crate::config::GatewayConfig;

/// Error document returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("{0} not allowed")]
    MethodNotAllowed(Method),

    #[error("{message}")]
    Body { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Body { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Clone)]
struct AppState {
    analyzer: Analyzer,
}

/// Extract `text` from a request body. An empty body reads as `{}`.
fn request_text(body: &[u8]) -> Result<String, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RequestError::EmptyText.into());
    }
    let payload: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    payload
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ApiError::Request(RequestError::EmptyText))
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let text = request_text(&body?)?;
    let report = state.analyzer.analyze(&text).await?;
    Ok(Json(report))
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(format!("internal error: {detail}")).into_response()
}

/// Build the gateway router.
pub fn router(analyzer: Analyzer, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/analyze", post(analyze).fallback(method_not_allowed))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(AppState { analyzer })
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &GatewayConfig) -> anyhow::Result<()> {
    let analyzer = Analyzer::from_config(config).context("Failed to build classifier clients")?;
    let app = router(analyzer, config.body_limit_bytes);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "Sentiment gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Sentiment gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
