//! Generative Language API client.
//!
//! Calls `POST {base_url}/models/{model}:generateContent` with the prompt
//! and the image as an inline base64 part.

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

use planview_core::{
    config::ModelConfig,
    traits::VisionModel,
    types::{ImagePayload, ModelResponse, UpstreamFailure},
    Error, Result,
};

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Hosted vision model client.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client from model configuration.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::config("model.api_key is not set"))?;
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn request_body(prompt: &str, image: &ImagePayload) -> serde_json::Value {
        let data = base64::engine::general_purpose::STANDARD.encode(&image.data);
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": image.mime_type, "data": data } }
                ]
            }]
        })
    }

    async fn send(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<ModelResponse, UpstreamFailure> {
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&Self::request_body(prompt, image))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamFailure::transport(format!(
                        "request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    UpstreamFailure::transport(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => {
                    UpstreamFailure::http(status.as_u16(), envelope.error.status, envelope.error.message)
                }
                Err(_) => UpstreamFailure::http(status.as_u16(), None, body),
            });
        }

        response
            .json::<ModelResponse>()
            .await
            .map_err(|e| UpstreamFailure::transport(format!("invalid response body: {}", e)))
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: &ImagePayload,
    ) -> std::result::Result<ModelResponse, UpstreamFailure> {
        let started = Instant::now();
        tracing::debug!(model = %model, image_size = image.data.len(), "Calling hosted model");

        let result = self.send(model, prompt, image).await;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("planview_upstream_latency_seconds", "model" => model.to_string())
            .record(elapsed);
        match &result {
            Ok(_) => tracing::debug!(model = %model, elapsed, "Hosted model responded"),
            Err(e) => tracing::warn!(model = %model, elapsed, error = %e, "Hosted model call failed"),
        }
        result
    }
}
