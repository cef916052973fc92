//! The network seam of the transformation client.

use crate::error::{parse_retry_after, sanitize_error_message, TransportError};
use crate::transform::wire::{GenerateContentRequest, GenerateContentResponse};
use async_trait::async_trait;
use std::time::Duration;

/// Default Gemini API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Carries `generateContent` calls to the remote model.
///
/// [`HttpTransport`] is the real implementation; tests substitute their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues one `generateContent` call for `model`.
    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError>;

    /// Checks that `model` is reachable with the configured credential.
    async fn get_model(&self, model: &str) -> Result<(), TransportError>;
}

/// `reqwest`-backed transport for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTransport {
    /// Creates a transport. A `None` key makes every call fail with [`TransportError::Auth`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    fn api_key(&self) -> Result<&str, TransportError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| TransportError::Auth("API key is not configured".into()))
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}", self.base_url, model)
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Network(err),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, TransportError> {
        let api_key = self.api_key()?;
        let url = format!("{}:generateContent", self.model_url(model));

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_model(&self, model: &str) -> Result<(), TransportError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.model_url(model))
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let headers = response.headers().clone();
        let text = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &text, &headers))
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> TransportError {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => TransportError::Auth(text),
        404 => TransportError::Api {
            status,
            message: "Model not found. Verify the model name is correct.".into(),
        },
        429 => TransportError::RateLimited {
            retry_after: parse_retry_after(headers).map(Duration::from_secs),
        },
        // Gemini reports a bad key as 400 INVALID_ARGUMENT.
        400 if text.contains("API key") => TransportError::Auth(text),
        _ => TransportError::Api {
            status,
            message: text,
        },
    }
}
