//! HTTP endpoints that turn text into a feeling and a motion plan.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use feelform_core::errors::GatewayError;
use feelform_llm::pipeline;
use feelform_llm::prompts::prepare_text;
use feelform_llm::{Feeling, TextGenerator};

use crate::config::ConfigError;
use crate::server::AppState;

const TEXT_REQUIRED: &str = "text is required";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    NotConfigured(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::NotConfigured(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": e.to_string() }),
            ),
            Self::Gateway(e) => gateway_response(e),
        };
        (status, Json(body)).into_response()
    }
}

fn gateway_response(err: GatewayError) -> (StatusCode, Value) {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match err {
        GatewayError::UpstreamUnavailable { status, detail } => json!({
            "error": "LLM proxy request failed",
            "details": { "status": status, "body": detail },
        }),
        GatewayError::MalformedModelOutput { raw } => json!({
            "error": "Model output was not valid JSON",
            "raw": raw,
        }),
        GatewayError::InvalidRequest(message) => json!({ "error": message }),
    };
    (status, body)
}

/// Validate the request text and resolve the configured generator, in that order.
fn prepare(
    state: &AppState,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(Value, String, Arc<dyn TextGenerator>), ApiError> {
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e, "rejected request body");
        ApiError::BadRequest(TEXT_REQUIRED.into())
    })?;
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .and_then(prepare_text)
        .ok_or_else(|| ApiError::BadRequest(TEXT_REQUIRED.into()))?;
    let generator = state.generator.clone()?;
    Ok((body, text, generator))
}

pub async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Feeling>, ApiError> {
    let (_, text, generator) = prepare(&state, body)?;
    let feeling = pipeline::analyze_feeling(generator.as_ref(), &text)
        .await
        .inspect_err(log_gateway_error)?;
    Ok(Json(feeling))
}

pub async fn motion_plan_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (body, text, generator) = prepare(&state, body)?;
    // Client-supplied; sanitized again before it feeds parameter fallbacks.
    let feeling = Feeling::from_value(body.get("feeling").unwrap_or(&Value::Null));
    let plan = pipeline::plan_motion(generator.as_ref(), &text, &feeling)
        .await
        .inspect_err(log_gateway_error)?;
    Ok(Json(json!(plan)))
}

pub async fn feel_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (_, text, generator) = prepare(&state, body)?;
    let (feeling, plan) = pipeline::feel(generator.as_ref(), &text)
        .await
        .inspect_err(log_gateway_error)?;
    Ok(Json(json!({ "feeling": feeling, "plan": plan })))
}

fn log_gateway_error(err: &GatewayError) {
    tracing::warn!(error_kind = err.error_kind(), error = %err, "analysis request failed");
}
