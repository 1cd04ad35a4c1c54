//! Minimal unified LLM client for Scout's reasoning engine.
//!
//! Provides the unified request/response model, the `ProviderAdapter` trait,
//! `LlmClient` with its middleware chain, and the Anthropic Messages adapter.

mod anthropic;
mod client;
mod provider;
mod types;

pub use anthropic::AnthropicAdapter;
pub use client::*;
pub use provider::*;
pub use types::*;
