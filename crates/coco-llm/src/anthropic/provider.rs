use reqwest::Client;
use tracing::{debug, instrument};

use super::convert::convert_messages;
use super::types::{
    AnthropicConfig, AnthropicError, AnthropicRequest, AnthropicResponse, ResponseContentBlock,
    API_VERSION,
};
use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;
use crate::util::sanitize_api_error;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    ///
    /// # Errors
    /// Returns [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    ///
    /// # Errors
    /// Returns [`Error::NotConfigured`] if `ANTHROPIC_API_KEY` is not set.
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    /// Send request to Anthropic API
    async fn send_request(&self, request: &AnthropicRequest) -> Result<AnthropicResponse> {
        let url = format!("{}/v1/messages", self.config.base_url);

        debug!(url = %url, model = %request.model, "Sending request to Anthropic");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<AnthropicError>(&body) {
                Ok(error) => format!("{}: {}", error.error.r#type, error.error.message),
                // SECURITY: Don't expose raw HTTP response body
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return Err(classify_status(status.as_u16(), &message));
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    fn transport_error(&self, error: &reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            Error::Network(error.to_string())
        }
    }
}

/// Map an HTTP failure status onto the retryable/fatal error taxonomy
pub(crate) fn classify_status(status: u16, message: &str) -> Error {
    match status {
        401 | 403 => Error::Auth(sanitize_api_error(message)),
        429 => Error::RateLimit,
        529 => Error::Overloaded,
        500..=599 => Error::Server {
            status,
            message: sanitize_api_error(message),
        },
        _ => Error::InvalidRequest(sanitize_api_error(message)),
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = if request.model.is_empty() {
            self.config.default_model.clone()
        } else {
            request.model
        };

        let (system, messages) = convert_messages(&request.messages);
        if messages.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one user message is required".to_string(),
            ));
        }

        let anthropic_request = AnthropicRequest {
            model,
            max_tokens: request.params.max_tokens,
            system,
            messages,
            temperature: request.params.temperature,
            stop_sequences: request.params.stop,
        };

        let response = self.send_request(&anthropic_request).await?;

        let content = response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let usage = TokenUsage {
            prompt_tokens: response.usage.input_tokens,
            completion_tokens: response.usage.output_tokens,
            total_tokens: response.usage.input_tokens + response.usage.output_tokens,
        };

        debug!(
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Anthropic completion received"
        );

        Ok(CompletionResponse {
            content,
            usage: Some(usage),
            finish_reason: response.stop_reason,
            model: response.model,
        })
    }
}
