//! Gemini API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::GeminiConfig;

use super::analysis::{ImageAnalysis, parse_image_analysis};
use super::error::{AiError, ApiErrorResponse};
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use super::{IMAGE_ANALYSIS_PROMPT, ListingAssistant, ListingFacts};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DESCRIPTION_MAX_TOKENS: u32 = 512;

/// Gemini API client.
///
/// Cheap to clone; the HTTP client and settings live behind an `Arc`.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<GeminiClientInner>,
}

struct GeminiClientInner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Errors
    ///
    /// Returns `AiError::Unauthorized` if the API key is not a valid header
    /// value and `AiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GeminiConfig) -> Result<Self, AiError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| AiError::Unauthorized("API key contains invalid characters".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-goog-api-key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(GeminiClientInner {
                client,
                endpoint: format!("{GEMINI_API_BASE}/{}:generateContent", config.model),
                model: config.model.clone(),
            }),
        })
    }

    /// Send a `generateContent` request and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the API answers with an error,
    /// or the reply has no text.
    #[instrument(skip(self, request), fields(model = %self.inner.model))]
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, AiError> {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AiError::Parse(format!("Failed to parse response: {e}")))?;
        parsed.text().ok_or(AiError::EmptyResponse)
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> AiError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return AiError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return AiError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => AiError::Api {
                    status: api_error.error.status,
                    message: api_error.error.message,
                },
                Err(_) => AiError::Api {
                    status: status.to_string(),
                    message: body,
                },
            },
            Err(e) => AiError::Http(e),
        }
    }
}

#[async_trait]
impl ListingAssistant for GeminiClient {
    #[instrument(skip_all, fields(make = %facts.make, model = %facts.model))]
    async fn describe_listing(&self, facts: &ListingFacts) -> Result<String, AiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(facts.description_prompt())])],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(DESCRIPTION_MAX_TOKENS),
                response_mime_type: None,
            }),
        };
        self.generate(&request).await
    }

    #[instrument(skip_all, fields(mime_type = %mime_type, bytes = image.len()))]
    async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ImageAnalysis, AiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::text(IMAGE_ANALYSIS_PROMPT),
                Part::inline(mime_type, BASE64.encode(image)),
            ])],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: None,
                response_mime_type: Some("application/json".to_string()),
            }),
        };
        let text = self.generate(&request).await?;
        let analysis = parse_image_analysis(&text)?;
        tracing::info!(?analysis, "Image analyzed");
        Ok(analysis)
    }
}
