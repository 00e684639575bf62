//! The HTTP surface of the notarization service.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use oracle_session::CryptoSession;
use oracle_shared::{AttestationRequest, NotarizationResponse, OracleError};

use crate::oracle::{EnclaveInfo, Oracle};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// An `OracleError` rendered as an HTTP response: validation errors map to
/// 400, everything else to 500, with the stable code and name in the body.
pub struct ApiError(OracleError);

impl From<OracleError> for ApiError {
    fn from(err: OracleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let mut payload = json!({
            "error_code": self.0.code(),
            "error_name": self.0.name(),
            "error_message": self.0.to_string(),
        });
        if let Some(upstream) = self.0.response_status_code() {
            payload["response_status_code"] = json!(upstream);
        }
        (status, Json(payload)).into_response()
    }
}

pub fn router<S: CryptoSession + 'static>(oracle: Arc<Oracle<S>>) -> Router {
    Router::new()
        .route("/notarize", post(notarize::<S>))
        .route("/info", get(info::<S>))
        .route("/health", get(health))
        .layer(middleware::from_fn(request_id))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(oracle)
}

pub async fn serve<S: CryptoSession + 'static>(
    listener: tokio::net::TcpListener,
    oracle: Arc<Oracle<S>>,
) -> std::io::Result<()> {
    axum::serve(listener, router(oracle)).await
}

async fn notarize<S: CryptoSession + 'static>(
    State(oracle): State<Arc<Oracle<S>>>,
    Json(req): Json<AttestationRequest>,
) -> Result<Json<NotarizationResponse>, ApiError> {
    Ok(Json(oracle.notarize(req).await?))
}

async fn info<S: CryptoSession + 'static>(
    State(oracle): State<Arc<Oracle<S>>>,
) -> Result<Json<EnclaveInfo>, ApiError> {
    Ok(Json(oracle.enclave_info()?))
}

async fn health() -> &'static str {
    "ok"
}

/// Attach a fresh request id to the span of everything handled downstream.
async fn request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        %id,
        method = %request.method(),
        uri = %request.uri()
    );
    async move { next.run(request).await }.instrument(span).await
}
