use crate::http::types::{BadBody, HttpError, IngressError, WebhookResponse, HEALTH_MESSAGE};
use crate::http::HttpState;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::Method;
use axum::Json;
use serde_json::Value;
use tracing::log::{info, warn};

#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Service is running", body = String, content_type = "text/plain",
            example = json!("LiveKit is up and running!"))
    )
))]
pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/webhook",
    tag = "Webhook",
    request_body = crate::http::types::WebhookPayload,
    responses(
        (status = 200, body = crate::http::types::WebhookResponse,
            example = json!({"message": "Webhook received", "processed_output": "Hello there!"})),
        (status = 400, description = "Unreadable body, invalid JSON or missing speech_input", body = String, content_type = "text/plain"),
        (status = 405, description = "Method other than POST", body = String, content_type = "text/plain"),
        (status = 500, description = "Completion API call failed", body = String, content_type = "text/plain",
            example = json!("Error processing speech: no choices in completion response"))
    )
))]
pub async fn webhook(
    State(state): State<HttpState>,
    method: Method,
    body: Body,
) -> Result<Json<WebhookResponse>, HttpError> {
    if method != Method::POST {
        return Err(IngressError::InvalidMethod.into());
    }

    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|_| IngressError::from(BadBody::Unreadable))?;

    let speech_input = extract_speech_input(&body).map_err(IngressError::from)?;
    let processed_output = state.bridge.translate(&speech_input).await.map_err(|e| {
        warn!("Failed to process speech: {e}");
        IngressError::from(e)
    })?;

    Ok(Json(WebhookResponse::new(processed_output)))
}

/// Decodes the webhook body and pulls out the `speech_input` text.
fn extract_speech_input(body: &Bytes) -> Result<String, BadBody> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| BadBody::InvalidJson)?;
    if !payload.is_object() {
        return Err(BadBody::InvalidJson);
    }
    info!("Webhook received: {payload}");

    payload
        .get("speech_input")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(BadBody::MissingSpeechInput)
}
