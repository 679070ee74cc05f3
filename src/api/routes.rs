// ============================================================
// Layer 1 — HTTP Routes and Error Mapping
// ============================================================
// Status codes by error kind:
//
//   SchemaError / DataError  → 400 Bad Request
//   EncodingError            → 422 Unprocessable Entity
//   unknown bundle           → 404 Not Found
//   ArtifactError            → 500 Internal Server Error
//
// Every failure body has the same shape:
//   {"error": {"type": "encoding_error", "message": "..."}}

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::domain::error::ModelError;
use crate::ml::inferencer::{round_price, FeatureMap};
use crate::ml::registry::{ModelRegistry, PredictError};

/// Shared, read-only handler state.
#[derive(Debug)]
pub struct ApiState {
    pub registry: Arc<ModelRegistry>,
    /// Decimal places of the returned price
    pub decimals: u32,
}

pub fn build_router(registry: Arc<ModelRegistry>, decimals: u32) -> Router {
    let state = Arc::new(ApiState { registry, decimals });
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict_routed))
        .route("/predict/:bundle", post(predict_named))
        .with_state(state)
}

// ─── Response Bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status:      &'static str,
    bundles:     Vec<String>,
    /// Request field that routes `POST /predict`, if the bundles are segmented
    segment_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    predicted_price: f64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message:    String,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError {
    status:     StatusCode,
    error_type: &'static str,
    message:    String,
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::UnknownBundle(_) => Self {
                status:     StatusCode::NOT_FOUND,
                error_type: "not_found",
                message:    err.to_string(),
            },
            PredictError::Model(e) => e.into(),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        let status = match err {
            ModelError::Schema { .. } | ModelError::Data(_) => StatusCode::BAD_REQUEST,
            ModelError::Encoding { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ModelError::Artifact(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error_type: err.kind(), message: err.to_string() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status:     StatusCode::BAD_REQUEST,
            error_type: "schema_error",
            message:    format!("request body must be a JSON object: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        } else {
            tracing::warn!("Rejected request ({}): {}", self.status, self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail { error_type: self.error_type.to_string(), message: self.message },
        };
        (self.status, Json(body)).into_response()
    }
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// `GET /health`
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status:      "ok",
        bundles:     state.registry.ids().into_iter().map(str::to_string).collect(),
        segment_key: state.registry.segment_key().map(str::to_string),
    })
}

/// `POST /predict`
async fn predict_routed(
    State(state): State<Arc<ApiState>>,
    body: Result<Json<FeatureMap>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body?;
    predict(&state, None, &request)
}

/// `POST /predict/:bundle`
async fn predict_named(
    State(state): State<Arc<ApiState>>,
    Path(bundle): Path<String>,
    body: Result<Json<FeatureMap>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = body?;
    predict(&state, Some(&bundle), &request)
}

fn predict(state: &ApiState, bundle: Option<&str>, request: &FeatureMap) -> Result<Json<PredictResponse>, ApiError> {
    let prediction = state.registry.predict(bundle, request)?;
    tracing::debug!("Bundle '{}' predicted {:.4}", prediction.bundle_id, prediction.price);
    Ok(Json(PredictResponse { predicted_price: round_price(prediction.price, state.decimals) }))
}
