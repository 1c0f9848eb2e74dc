mod routes;
mod types;

#[cfg(feature = "openapi")]
mod openapi;

use crate::completion::CompletionBridge;
use crate::config::{HTTPConfig, TLSConfig};
use crate::http::routes::*;
use anyhow::Result;
use axum::http::{HeaderName, HeaderValue};
use axum::routing::any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::log::{debug, info};

#[cfg(feature = "openapi")]
use utoipa::OpenApi;

#[derive(Clone)]
pub struct HttpState {
    pub bridge: Arc<CompletionBridge>,
    pub max_body_size: usize,
}

pub fn create_app(config: &HTTPConfig, bridge: CompletionBridge) -> axum::Router {
    let mut router = axum::Router::new()
        .route("/", any(health))
        .route("/health", any(health))
        .route("/webhook", any(webhook));

    #[cfg(feature = "openapi")]
    {
        debug!("Adding OpenAPI SwaggerUi at /docs!");
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs")
                .url("/docs/openapi.json", openapi::ApiDoc::openapi()),
        );
    }

    // Unknown paths answer like the root health check.
    debug!("Routing unmatched paths to the health handler");
    router = router
        .fallback(health)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-version"),
            HeaderValue::from_static(crate::VERSION),
        ));

    let state = HttpState {
        bridge: Arc::new(bridge),
        max_body_size: config.max_body_size,
    };
    router.with_state(state)
}

/// Serves the app until the listener fails, over HTTPS when TLS is configured.
pub async fn serve(app: axum::Router, address: SocketAddr, tls: Option<TLSConfig>) -> Result<()> {
    let Some(_tls_config) = tls else {
        info!("Starting HTTP (insecure) server on {address}");
        return axum_server::bind(address)
            .serve(app.into_make_service())
            .await
            .map_err(anyhow::Error::from);
    };

    #[cfg(feature = "tls-rustls")]
    {
        info!("Starting HTTPS (secure) server on {address}");
        let _ = rustls::crypto::CryptoProvider::install_default(
            rustls::crypto::aws_lc_rs::default_provider(),
        );
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &_tls_config.certificate_path,
            &_tls_config.key_path,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load rustls TLS certificates: {e}"))?;

        axum_server::bind_rustls(address, tls)
            .serve(app.into_make_service())
            .await
            .map_err(anyhow::Error::from)
    }

    #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
    {
        info!("Starting HTTPS (secure) server on {address}");
        let tls = axum_server::tls_openssl::OpenSSLConfig::from_pem_file(
            &_tls_config.certificate_path,
            &_tls_config.key_path,
        )
        .map_err(|e| anyhow::anyhow!("Failed to load openssl TLS certificates: {e}"))?;

        axum_server::bind_openssl(address, tls)
            .serve(app.into_make_service())
            .await
            .map_err(anyhow::Error::from)
    }

    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
    Err(anyhow::anyhow!(
        "HTTP Server TLS configuration provided but no TLS features enabled. Compile with a TLS backend feature!"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COMPLETION_PATH: &str = "/v1/chat/completions";

    fn test_app(server: &MockServer) -> axum::Router {
        let completion = CompletionConfig {
            url: format!("{}{COMPLETION_PATH}", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        };
        let http = HTTPConfig {
            max_body_size: 1024,
            ..Default::default()
        };
        let bridge = CompletionBridge::new(&completion, "test-key").unwrap();
        create_app(&http, bridge)
    }

    async fn stub_completion(server: &MockServer, body: Value, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(wiremock::matchers::path(COMPLETION_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn no_completion_calls(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(server)
            .await;
    }

    async fn send(
        app: axum::Router,
        method: &str,
        uri: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();

        let response = app.oneshot(request).await.expect("failed to make request");
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");

        (status, String::from_utf8(body_bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_routes() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        for uri in ["/", "/health", "/some/other/path"] {
            let (status, body) = send(test_app(&server), "GET", uri, Body::empty()).await;
            assert_eq!(status, StatusCode::OK, "uri: {uri}");
            assert_eq!(body, "LiveKit is up and running!\n");
        }
    }

    #[tokio::test]
    async fn test_version_header() {
        let server = MockServer::start().await;
        let response = test_app(&server)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-version").unwrap(), crate::VERSION);
    }

    #[tokio::test]
    async fn test_webhook_rejects_other_methods() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        for method in ["GET", "PUT", "DELETE", "PATCH"] {
            let (status, body) = send(
                test_app(&server),
                method,
                "/webhook",
                r#"{"speech_input":"hi"}"#,
            )
            .await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "method: {method}");
            assert_eq!(body, "Invalid request method\n");
        }
    }

    #[tokio::test]
    async fn test_webhook_rejects_preflight() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/webhook")
            .header("origin", "https://caller.example")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let response = test_app(&server).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_webhook_rejects_invalid_json() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        for payload in ["", "{not json", "[]", r#"["speech_input"]"#, "\"hi\"", "7"] {
            let (status, body) = send(test_app(&server), "POST", "/webhook", payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload:?}");
            assert_eq!(body, "Invalid JSON payload\n");
        }
    }

    #[tokio::test]
    async fn test_webhook_rejects_missing_speech_input() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        for payload in [
            "{}",
            r#"{"speech_input":1}"#,
            r#"{"speech_input":null}"#,
            r#"{"text":"hi"}"#,
        ] {
            let (status, body) = send(test_app(&server), "POST", "/webhook", payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {payload:?}");
            assert_eq!(body, "Missing or invalid speech_input\n");
        }
    }

    #[tokio::test]
    async fn test_webhook_rejects_oversized_body() {
        let server = MockServer::start().await;
        no_completion_calls(&server).await;

        let payload = json!({"speech_input": "a".repeat(4096)}).to_string();
        let (status, body) = send(test_app(&server), "POST", "/webhook", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error reading request body\n");
    }

    #[tokio::test]
    async fn test_webhook_success() {
        let server = MockServer::start().await;
        let reply = json!({"choices": [{"message": {"content": "hello"}}]});
        stub_completion(&server, reply, 1).await;

        let (status, body) = send(
            test_app(&server),
            "POST",
            "/webhook",
            r#"{"speech_input":"hi","participant":"alice"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#""processed_output":"hello""#));

        let decoded: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            decoded,
            json!({"message": "Webhook received", "processed_output": "hello"})
        );
    }

    #[tokio::test]
    async fn test_webhook_remote_error() {
        let server = MockServer::start().await;
        stub_completion(&server, json!({"error": {"message": "bad key"}}), 1).await;

        let (status, body) =
            send(test_app(&server), "POST", "/webhook", r#"{"speech_input":"hi"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.to_lowercase().contains("error processing speech"));
        assert!(body.contains("bad key"));
    }

    #[tokio::test]
    async fn test_webhook_no_choices() {
        let server = MockServer::start().await;
        stub_completion(&server, json!({"choices": []}), 1).await;

        let (status, body) =
            send(test_app(&server), "POST", "/webhook", r#"{"speech_input":"hi"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            "Error processing speech: no choices in completion response\n"
        );
    }

    #[tokio::test]
    async fn test_webhook_unreachable_remote() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let completion = CompletionConfig {
            url: format!("http://{address}{COMPLETION_PATH}"),
            timeout_secs: 5,
            ..Default::default()
        };
        let bridge = CompletionBridge::new(&completion, "test-key").unwrap();
        let app = create_app(&HTTPConfig::default(), bridge);

        let (status, body) = send(app, "POST", "/webhook", r#"{"speech_input":"hi"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with("Error processing speech: completion API request failed"));
    }

    #[tokio::test]
    async fn test_webhook_output_is_deterministic() {
        let server = MockServer::start().await;
        let reply = json!({"choices": [{"message": {"content": "same"}}]});
        stub_completion(&server, reply, 2).await;

        let app = test_app(&server);
        let payload = r#"{"speech_input":"repeat after me"}"#;
        let first = send(app.clone(), "POST", "/webhook", payload).await;
        let second = send(app, "POST", "/webhook", payload).await;

        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(first, second);
    }
}
