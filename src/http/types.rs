use crate::completion::BridgeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const HEALTH_MESSAGE: &str = "LiveKit is up and running!\n";
pub const WEBHOOK_RECEIVED: &str = "Webhook received";

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WebhookResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub message: &'static str,
    pub processed_output: String,
}
impl WebhookResponse {
    pub fn new(processed_output: String) -> Self {
        Self {
            message: WEBHOOK_RECEIVED,
            processed_output,
        }
    }
}

/// Request body accepted by `/webhook`. Only documents the required field,
/// any other keys are accepted and ignored.
#[cfg(feature = "openapi")]
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct WebhookPayload {
    pub speech_input: String,
}

/// Everything that can end a webhook request early.
#[derive(thiserror::Error, Debug)]
pub enum IngressError {
    #[error("Invalid request method")]
    InvalidMethod,

    #[error("{0}")]
    BadBody(BadBody),

    #[error("Error processing speech: {0}")]
    Processing(#[from] BridgeError),
}
impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            IngressError::BadBody(_) => StatusCode::BAD_REQUEST,
            IngressError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadBody {
    #[error("Error reading request body")]
    Unreadable,

    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Missing or invalid speech_input")]
    MissingSpeechInput,
}
impl From<BadBody> for IngressError {
    fn from(reason: BadBody) -> Self {
        IngressError::BadBody(reason)
    }
}

/// Plain text error response.
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        // Line terminated, like the health text.
        (self.status, format!("{}\n", self.message)).into_response()
    }
}
impl From<IngressError> for HttpError {
    fn from(error: IngressError) -> Self {
        HttpError {
            status: error.status(),
            message: error.to_string(),
        }
    }
}
