//! The transformation client: one image + one prompt in, one image out.

use crate::error::{RetouchError, Result};
use crate::image::{TransformationRequest, TransformedImage};
use crate::transform::transport::{HttpTransport, Transport, DEFAULT_BASE_URL};
use crate::transform::wire::GenerateContentRequest;
use std::time::{Duration, Instant};

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "API_KEY"];

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini image-capable model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// All known variants.
    pub const ALL: [GeminiModel; 2] = [Self::NanoBanana, Self::NanoBananaPro];

    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }
}

impl std::fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key. `None` still builds a client whose calls fail with an auth error.
    pub api_key: Option<String>,
    /// Model to call.
    pub model: GeminiModel,
    /// API root, without trailing slash.
    pub base_url: String,
    /// Per-request timeout; `None` leaves the transport default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: GeminiModel::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl ClientConfig {
    /// Default configuration with the API key taken from `GOOGLE_API_KEY` or `API_KEY`.
    pub fn from_env() -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty());
        Self {
            api_key,
            ..Self::default()
        }
    }
}

/// Builder for [`TransformationClient`].
#[derive(Debug, Clone, Default)]
pub struct TransformationClientBuilder {
    config: ClientConfig,
}

impl TransformationClientBuilder {
    /// Creates a builder with default settings and no API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Sets the model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.config.model = model;
        self
    }

    /// Overrides the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the request timeout; `None` disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Builds a client over HTTP.
    ///
    /// A missing key is logged once here and is not an error.
    pub fn build(self) -> Result<TransformationClient> {
        let config = self.config;
        let transport = HttpTransport::new(&config.base_url, config.api_key.clone(), config.timeout)?;
        Ok(Self::from_config(config).build_with_transport(transport))
    }

    /// Builds a client over a custom transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> TransformationClient<T> {
        if self.config.api_key.is_none() {
            tracing::warn!(
                "API key is missing (set {} or pass one explicitly); image transformation will fail",
                API_KEY_ENV_VARS.join(" or ")
            );
        }
        TransformationClient {
            transport,
            model: self.config.model,
        }
    }
}

/// Runs image transformation cycles against a remote model.
pub struct TransformationClient<T = HttpTransport> {
    transport: T,
    model: GeminiModel,
}

impl TransformationClient {
    /// Creates a new `TransformationClientBuilder`.
    pub fn builder() -> TransformationClientBuilder {
        TransformationClientBuilder::new()
    }
}

impl<T: Transport> TransformationClient<T> {
    /// The configured model.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Performs one request/response cycle.
    ///
    /// Invalid requests fail with [`RetouchError::InvalidInput`] and send
    /// nothing. Transport failures are logged, then returned as
    /// [`RetouchError::Transformation`].
    pub async fn transform(&self, request: &TransformationRequest) -> Result<TransformedImage> {
        request.validate()?;

        let start = Instant::now();
        let body = GenerateContentRequest::from_transformation_request(request);
        tracing::debug!(
            model = self.model.as_str(),
            mime_type = request.image.mime_type(),
            prompt_len = request.prompt.len(),
            "dispatching image transformation"
        );

        let result = match self.transport.generate_content(self.model.as_str(), &body).await {
            Ok(response) => response.into_image(),
            Err(err) => {
                tracing::error!(error = ?err, "image transformation request failed");
                Err(RetouchError::from(err))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(duration_ms, "image transformation complete"),
            Err(err @ (RetouchError::ModelRefused(_) | RetouchError::EmptyResponse(_))) => {
                tracing::warn!(duration_ms, kind = ?err.kind(), "model returned no image: {err}")
            }
            Err(_) => {}
        }
        result
    }

    /// Checks that the model is reachable with the configured key.
    pub async fn health_check(&self) -> Result<()> {
        self.transport
            .get_model(self.model.as_str())
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "health check failed");
                RetouchError::from(err)
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportError, FALLBACK_MESSAGE};
    use crate::image::EncodedImage;
    use crate::transform::wire::GenerateContentResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a canned response and records what was sent.
    pub(crate) struct MockTransport {
        reply: Mutex<Option<std::result::Result<String, TransportError>>>,
        pub(crate) calls: AtomicUsize,
        pub(crate) last_body: Mutex<Option<serde_json::Value>>,
    }

    impl MockTransport {
        pub(crate) fn json(body: &str) -> Self {
            Self::with(Ok(body.to_string()))
        }

        pub(crate) fn failing(err: TransportError) -> Self {
            Self::with(Err(err))
        }

        fn with(reply: std::result::Result<String, TransportError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                calls: AtomicUsize::new(0),
                last_body: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn generate_content(
            &self,
            _model: &str,
            body: &GenerateContentRequest,
        ) -> std::result::Result<GenerateContentResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_body.lock().unwrap() = Some(serde_json::to_value(body).unwrap());
            let reply = self
                .reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(TransportError::Other("no reply queued".into())));
            Ok(serde_json::from_str(&reply?)?)
        }

        async fn get_model(&self, _model: &str) -> std::result::Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub(crate) fn client(transport: MockTransport) -> TransformationClient<MockTransport> {
        TransformationClient::builder()
            .api_key("test-key")
            .build_with_transport(transport)
    }

    fn request(prompt: &str) -> TransformationRequest {
        let image = EncodedImage::from_base64("iVBORw0KGgo=", "image/png").unwrap();
        TransformationRequest::new(image, prompt)
    }

    #[test]
    fn test_gemini_model_as_str() {
        assert_eq!(GeminiModel::NanoBanana.as_str(), "gemini-2.5-flash-image");
        assert_eq!(GeminiModel::default(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_build_without_key_succeeds() {
        let client = TransformationClient::builder().build();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_returns_png_data_url() {
        let mock = MockTransport::json(
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}]}}]}"#,
        );
        let client = client(mock);
        let image = client.transform(&request("add a hat")).await.unwrap();
        assert_eq!(image.data_url(), "data:image/png;base64,iVBORw0KGgo=");

        let body = client.transport.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "iVBORw0KGgo=");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "add a hat");
    }

    #[tokio::test]
    async fn test_refusal_carries_text() {
        let mock = MockTransport::json(
            r#"{"candidates": [{"content": {"parts": [{"text": "cannot comply"}]}}]}"#,
        );
        match client(mock).transform(&request("do it")).await {
            Err(RetouchError::ModelRefused(text)) => assert_eq!(text, "cannot comply"),
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let err = client(MockTransport::json(r#"{"candidates": []}"#))
            .transform(&request("do it"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[tokio::test]
    async fn test_silent_transport_failure_uses_fallback_message() {
        let err = client(MockTransport::failing(TransportError::Other(String::new())))
            .transform(&request("do it"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
        assert_eq!(err.to_string(), FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_message() {
        let err = client(MockTransport::failing(TransportError::Auth(
            "API key is not configured".into(),
        )))
        .transform(&request("do it"))
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
        assert!(err.to_string().contains("API key is not configured"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_transformation_error() {
        let err = client(MockTransport::json("<html>oops</html>"))
            .transform(&request("do it"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
    }

    #[tokio::test]
    async fn test_blank_prompt_never_dispatches() {
        let client = client(MockTransport::json(r#"{"candidates": []}"#));
        let err = client.transform(&request("   ")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_transformation_error() {
        let (base_url, server) = crate::transform::transport::tests::silent_server().await;
        let client = TransformationClient::builder()
            .api_key("test-key")
            .base_url(base_url)
            .timeout(Some(Duration::from_millis(100)))
            .build()
            .unwrap();

        let err = client.transform(&request("do it")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
        assert_eq!(err.to_string(), "request timed out after 100ms");
        server.abort();
    }

    #[tokio::test]
    async fn test_unconfigured_http_client_fails_with_auth_message() {
        let client = TransformationClient::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let err = client.transform(&request("do it")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
        assert!(err.to_string().starts_with("authentication failed"));
    }
}
