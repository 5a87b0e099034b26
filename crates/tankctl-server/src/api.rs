//! HTTP handlers for tank operations.
//!
//! Method calls take `{"inputArguments": [..]}` and answer with
//! `{"status": "Good", "outputArguments": [..]}`, the arguments being typed
//! [`Variant`]s. Failures answer with `{"status": <code>, "error": <message>}`.

use crate::middleware::CallerContext;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tankctl_control::{ControlError, TankSnapshot};
use tankctl_store::LogRecord;
use tankctl_types::{Quantity, StatusCode as TankStatus, Variant};
use thiserror::Error;

/// Request body for a method call.
#[derive(Debug, Default, Deserialize)]
pub struct MethodCallRequest {
    #[serde(rename = "inputArguments", default)]
    pub input_arguments: Vec<Value>,
}

/// Response body for a successful method call.
#[derive(Debug, Serialize, Deserialize)]
pub struct MethodCallResponse {
    pub status: TankStatus,
    #[serde(rename = "outputArguments")]
    pub output_arguments: Vec<Variant>,
}

impl MethodCallResponse {
    fn good(output_arguments: Vec<Variant>) -> Json<Self> {
        Json(Self {
            status: TankStatus::Good,
            output_arguments,
        })
    }
}

/// Query parameters for `GET /api/tank/history/{quantity}`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// Response body for history reads.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub quantity: Quantity,
    pub records: Vec<LogRecord>,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl ApiError {
    fn status(&self) -> (StatusCode, TankStatus) {
        match self {
            ApiError::Control(err) => {
                let http = match err {
                    ControlError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    ControlError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                    ControlError::DataUnavailable(_) => StatusCode::CONFLICT,
                    ControlError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (http, err.status())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, TankStatus::BadInvalidArgument),
            ApiError::InternalServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                TankStatus::BadInternalError,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (http, status) = self.status();
        // Store details stay in the server log.
        let message = match &self {
            ApiError::Control(ControlError::Internal { operation, .. }) => {
                format!("{operation} failed")
            }
            ApiError::InternalServerError(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "status": status,
            "error": message
        }));

        (http, body).into_response()
    }
}

/// Runs a store-bound operation on the blocking pool.
async fn run_blocking<T, F>(operation: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ControlError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| {
            tracing::error!("tank operation join error: {}", e);
            ApiError::InternalServerError(e.to_string())
        })?
        .map_err(ApiError::from)
}

// Malformed bodies are argument errors, answered like any other.
fn input_variants(
    payload: Result<Json<MethodCallRequest>, JsonRejection>,
) -> Result<Vec<Variant>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "method call body rejected");
        ApiError::Control(ControlError::InvalidArgument(rejection.body_text()))
    })?;
    request
        .input_arguments
        .iter()
        .map(|value| {
            Variant::from_json(value)
                .map_err(|e| ApiError::Control(ControlError::InvalidArgument(e.to_string())))
        })
        .collect()
}

/// Handler for `GET /api/tank`.
pub async fn read_attributes_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<TankSnapshot>, ApiError> {
    Ok(Json(state.dispatcher.read_attributes(&caller)?))
}

/// Handler for `POST /api/tank/methods/getTankSystemParams`.
///
/// Output arguments: `valvePosition` (Boolean), `fillPercentage` (Double),
/// `threshold` (Int32).
pub async fn get_tank_system_params_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
) -> Result<Json<MethodCallResponse>, ApiError> {
    let params = run_blocking(move || state.dispatcher.get_tank_system_params(&caller)).await?;

    Ok(MethodCallResponse::good(vec![
        Variant::Boolean(params.valve_position),
        Variant::Double(params.fill_percentage),
        Variant::Int32(params.threshold),
    ]))
}

/// Handler for `POST /api/tank/methods/setThreshold`.
pub async fn set_threshold_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    payload: Result<Json<MethodCallRequest>, JsonRejection>,
) -> Result<Json<MethodCallResponse>, ApiError> {
    let args = input_variants(payload)?;
    run_blocking(move || state.dispatcher.set_threshold(&caller, &args)).await?;
    Ok(MethodCallResponse::good(Vec::new()))
}

/// Handler for `POST /api/tank/methods/reportFillLevel`.
///
/// Output arguments: `fillPercentage` (Double), `valvePosition` (Boolean),
/// `valveChanged` (Boolean).
pub async fn report_fill_level_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    payload: Result<Json<MethodCallRequest>, JsonRejection>,
) -> Result<Json<MethodCallResponse>, ApiError> {
    let args = input_variants(payload)?;
    let report = run_blocking(move || state.dispatcher.report_fill_level(&caller, &args)).await?;

    Ok(MethodCallResponse::good(vec![
        Variant::Double(report.fill_percentage),
        Variant::Boolean(report.valve_position),
        Variant::Boolean(report.valve_changed),
    ]))
}

/// Handler for `GET /api/tank/history/{quantity}`.
pub async fn read_history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(quantity): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let quantity = quantity
        .parse::<Quantity>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let records =
        run_blocking(move || state.dispatcher.read_history(&caller, quantity, query.limit)).await?;

    Ok(Json(HistoryResponse { quantity, records }))
}
