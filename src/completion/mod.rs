mod parser;
pub mod types;

pub use parser::parse_completion;

use crate::completion::types::CompletionRequest;
use crate::config::CompletionConfig;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::log::debug;

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("failed to serialize completion request: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("completion API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Malformed(#[from] MalformedResponse),

    #[error("completion API error: {0}")]
    RemoteApi(String),
}

#[derive(thiserror::Error, Debug)]
pub enum MalformedResponse {
    #[error("invalid JSON in completion response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("completion response is not a JSON object")]
    NotAnObject,

    #[error("no choices in completion response")]
    NoChoices,

    #[error("invalid choice format in completion response")]
    InvalidChoice,

    #[error("no generated text in completion response")]
    NoGeneratedText,
}

fn client_builder(config: &CompletionConfig) -> Result<reqwest::ClientBuilder> {
    let builder = Client::builder().timeout(config.timeout());
    let certificate_path = match &config.certificate_path {
        Some(path) => path,
        None => return Ok(builder),
    };

    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
    {
        let _ = certificate_path;
        Err(anyhow::anyhow!(
            "Completion certificate provided but no TLS features enabled. Compile with a TLS backend feature!"
        ))
    }

    #[cfg(any(feature = "tls-rustls", feature = "tls-native"))]
    {
        #[cfg(feature = "tls-rustls")]
        let builder = builder.use_rustls_tls();

        #[cfg(feature = "tls-native")]
        let builder = builder.use_native_tls();

        let certificate = load_certificate(certificate_path).with_context(|| {
            format!("Failed to load completion certificate: {certificate_path:?}")
        })?;
        Ok(builder.add_root_certificate(certificate))
    }
}

#[cfg(any(feature = "tls-rustls", feature = "tls-native"))]
fn load_certificate(certificate_path: &std::path::Path) -> Result<reqwest::tls::Certificate> {
    let cert_data = std::fs::read(certificate_path)?;

    if let Some("der") = certificate_path.extension().and_then(|s| s.to_str()) {
        return Ok(reqwest::tls::Certificate::from_der(&cert_data)?);
    }

    // Auto-detect format: try PEM first, then DER
    reqwest::tls::Certificate::from_pem(&cert_data)
        .or_else(|_| reqwest::tls::Certificate::from_der(&cert_data))
        .map_err(Into::into)
}

/// Relays speech input to the remote completion API.
///
/// Holds one pooled HTTP client and the fixed outbound headers, including the
/// bearer credential given at construction. Every call makes exactly one attempt.
pub struct CompletionBridge {
    client: Client,
    url: Url,
    headers: HeaderMap,
}
impl CompletionBridge {
    pub fn new(config: &CompletionConfig, api_key: &str) -> Result<Self> {
        let url = Url::parse(&config.url)
            .with_context(|| format!("Invalid completion API url: {}", config.url))?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("Completion API key contains characters not allowed in a header")?;
        authorization.set_sensitive(true);

        let mut headers = config.get_header_map()?.unwrap_or_default();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);

        let client = client_builder(config)?
            .build()
            .context("Failed to build completion API client")?;

        Ok(Self {
            client,
            url,
            headers,
        })
    }

    pub async fn translate(&self, speech_input: &str) -> Result<String, BridgeError> {
        let request = CompletionRequest::from_speech(speech_input);
        let body = serde_json::to_vec(&request).map_err(BridgeError::Serialization)?;

        let response = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let raw = response.bytes().await?;

        debug!("Completion API status: {}", status.as_u16());
        debug!(
            "Completion API raw response: {}",
            String::from_utf8_lossy(&raw)
        );

        parse_completion(&raw)
    }
}
