use crate::completion::types::{CompletionChoice, CompletionResponse};
use crate::completion::{BridgeError, MalformedResponse};
use serde::Deserialize;
use serde_json::Value;

/// Extracts the generated text from a raw completion reply.
///
/// Checks run in a fixed order: a top-level `error` wins over everything,
/// then `choices` must be a non-empty array, then the first choice must be an
/// object carrying `message.content` as a string. The text is returned as-is.
pub fn parse_completion(body: &[u8]) -> Result<String, BridgeError> {
    let value: Value = serde_json::from_slice(body).map_err(MalformedResponse::InvalidJson)?;
    if !value.is_object() {
        return Err(MalformedResponse::NotAnObject.into());
    }

    let response: CompletionResponse =
        serde_json::from_value(value).map_err(MalformedResponse::InvalidJson)?;

    if let Some(error) = response.error {
        return Err(BridgeError::RemoteApi(error.to_string()));
    }

    let first = response
        .choices
        .as_ref()
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or(MalformedResponse::NoChoices)?;

    if !first.is_object() {
        return Err(MalformedResponse::InvalidChoice.into());
    }

    let choice =
        CompletionChoice::deserialize(first).map_err(|_| MalformedResponse::InvalidChoice)?;
    choice
        .content()
        .map(str::to_owned)
        .ok_or_else(|| MalformedResponse::NoGeneratedText.into())
}
