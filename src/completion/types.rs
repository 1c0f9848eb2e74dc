use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMPLETION_MODEL: &str = "gpt-4o-mini";
pub const COMPLETION_MAX_TOKENS: u32 = 50;
pub const COMPLETION_TEMPERATURE: f64 = 0.7;

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'static str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f64,
}
impl<'a> CompletionRequest<'a> {
    /// A single user turn carrying the speech input, with the fixed model settings.
    pub fn from_speech(speech_input: &'a str) -> Self {
        Self {
            model: COMPLETION_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: speech_input,
            }],
            max_tokens: COMPLETION_MAX_TOKENS,
            temperature: COMPLETION_TEMPERATURE,
        }
    }
}

/// Top level of a completion reply. Both fields stay loosely typed so that
/// shape problems surface as named errors instead of one decode failure.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub error: Option<Value>,

    #[serde(default)]
    pub choices: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<Value>,
}
impl CompletionChoice {
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
    }
}
