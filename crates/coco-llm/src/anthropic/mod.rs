//! Anthropic - Claude Messages API provider
//!
//! This module implements the Anthropic provider using reqwest.

/// Message conversion utilities
pub mod convert;
/// Provider implementation
pub mod provider;
/// API types and configuration
pub mod types;


pub use provider::AnthropicProvider;
pub use types::{AnthropicConfig, API_VERSION, DEFAULT_BASE_URL};
