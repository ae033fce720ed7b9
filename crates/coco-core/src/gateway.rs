//! LLM gateway
//!
//! The single path from the core to the provider: tier to model mapping,
//! cache lookup, then provider call with backoff on retryable failures.

use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::utils::{retry_with_backoff, RetryConfig};
use coco_llm::{CompletionParams, CompletionRequest, LlmProvider, Message, ModelSelection, ModelTier};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Cached, retrying access to the provider
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    cache: Arc<ResponseCache>,
    models: ModelSelection,
    retry: RetryConfig,
}

impl LlmGateway {
    /// Create a gateway with the default retry policy
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, cache: Arc<ResponseCache>, models: ModelSelection) -> Self {
        Self {
            provider,
            cache,
            models,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Tier-to-model mapping
    #[must_use]
    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    /// The response cache
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Provider name
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Complete `messages` on the model for `tier`
    ///
    /// # Errors
    /// [`Error::Provider`] with the last provider error once retries (if
    /// any) are exhausted.
    #[instrument(skip(self, messages, params), fields(tier = %tier, messages = messages.len()))]
    pub async fn complete(
        &self,
        tier: ModelTier,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<String> {
        let model = self.models.model_for(tier).to_string();
        debug!(model = %model, "Completion requested");

        let request = CompletionRequest::new(&model)
            .with_messages(messages.clone())
            .with_params(params.clone());

        self.cache
            .get_or_compute(&model, &messages, &params, || async {
                retry_with_backoff(
                    &self.retry,
                    || self.provider.complete(request.clone()),
                    coco_llm::Error::is_retryable,
                )
                .await
                .map(|response| response.content)
                .map_err(|e| Error::Provider(e.last_error))
            })
            .await
    }
}
