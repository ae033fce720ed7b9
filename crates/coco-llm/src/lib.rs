//! Coco LLM - provider capability
//!
//! This crate provides the LLM side of coco:
//! - Provider: the `complete(model, messages, params) -> text` capability
//! - Anthropic: Claude Messages API provider (reqwest)
//! - Mock: scripted provider with call accounting, for tests
//! - Tier: simple/complex model classes and their model identifiers
//! - Token: tiktoken-based token counting used for history budgets

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod tier;
pub mod token;
pub mod util;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use completion::{CompletionParams, CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use tier::{ModelSelection, ModelTier};
pub use token::{count_tokens, TokenCounter};
