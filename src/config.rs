use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable holding the completion API bearer credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub http: HTTPConfig,

    #[serde(default)]
    pub completion: CompletionConfig,
}
impl AppConfig {
    /// Loads the config file. An explicitly given path must exist, while a
    /// missing default `config.toml` falls back to built-in defaults.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_filepath {
            Some(path) => path,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        Self::parse(&config_content)
            .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        if config.completion.timeout_secs == 0 {
            bail!("completion.timeout_secs must be greater than zero");
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    /// Largest accepted webhook body, larger bodies are treated as unreadable.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            max_body_size: default_max_body_size(),
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub url: String,

    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,

    /// Additional static headers sent with every completion request.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Extra root certificate, for self-hosted endpoints with a private CA.
    #[serde(deserialize_with = "deserialize_optional_existing_file")]
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
}
impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn get_header_map(&self) -> Result<Option<HeaderMap>> {
        let map = if let Some(headers) = &self.headers {
            headers
        } else {
            return Ok(None);
        };

        let mut out = HeaderMap::with_capacity(map.len());
        for (k, v) in map {
            let name = HeaderName::from_str(k)
                .with_context(|| format!("Invalid completion header name: {k}"))?;
            if name == AUTHORIZATION || name == CONTENT_TYPE {
                bail!("Completion header {name} is managed by the relay and cannot be overridden");
            }
            out.insert(
                name,
                HeaderValue::from_str(v)
                    .with_context(|| format!("Invalid value for completion header: {k}"))?,
            );
        }

        Ok(Some(out))
    }
}
impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: default_completion_url(),
            timeout_secs: default_completion_timeout(),
            headers: None,
            certificate_path: None,
        }
    }
}

fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 7880)
}
fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}
fn default_completion_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_completion_timeout() -> u64 {
    30
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.exists() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(path)
}

fn deserialize_optional_existing_file<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path_opt = Option::<String>::deserialize(deserializer)?;
    match path_opt {
        Some(path_str) => {
            let path_deserializer = serde::de::value::StringDeserializer::new(path_str);
            Ok(Some(deserialize_existing_file(path_deserializer)?))
        }
        None => Ok(None),
    }
}
