use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scout_types::{Result, ScoutError};

use crate::{DynProvider, ProviderAdapter, Request, Response};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut Request) {}
    fn after(&self, _request: &Request, _response: &mut Response) {}
}

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut Request) {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "LLM request"
        );
    }

    fn after(&self, _request: &Request, response: &mut Response) {
        tracing::debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = response.tool_calls.len(),
            finish = ?response.finish_reason,
            "LLM response"
        );
    }
}

/// Accumulates token usage across every call made through a client.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    total_input: Arc<AtomicU64>,
    total_output: Arc<AtomicU64>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input.load(Ordering::Relaxed)
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output.load(Ordering::Relaxed)
    }
}

impl Middleware for UsageTracker {
    fn after(&self, _request: &Request, response: &mut Response) {
        self.total_input
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.total_output
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// LlmClient
// ---------------------------------------------------------------------------

/// Routes requests to registered providers and runs the middleware chain.
pub struct LlmClient {
    providers: HashMap<String, DynProvider>,
    default_provider: Option<String>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl LlmClient {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: None,
            middleware: Vec::new(),
        }
    }

    /// Register a provider. The first one registered becomes the default.
    pub fn register_provider(&mut self, provider: impl ProviderAdapter + 'static) {
        let name = provider.name().to_string();
        if self.default_provider.is_none() {
            self.default_provider = Some(name.clone());
        }
        self.providers.insert(name, DynProvider::new(provider));
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    /// Default model of the default provider, if any is registered.
    pub fn default_model(&self) -> Option<&str> {
        self.default_provider
            .as_ref()
            .and_then(|name| self.providers.get(name))
            .map(|p| p.default_model())
    }

    pub async fn complete(&self, request: &Request) -> Result<Response> {
        let provider = self.resolve_provider(request)?;
        let mut req = request.clone();

        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp = provider.complete(&req).await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }

        Ok(resp)
    }

    fn resolve_provider(&self, request: &Request) -> Result<&DynProvider> {
        if let Some(ref provider_name) = request.provider {
            return self.providers.get(provider_name).ok_or_else(|| {
                ScoutError::Other(format!("Provider '{}' not registered", provider_name))
            });
        }

        self.default_provider
            .as_ref()
            .and_then(|name| self.providers.get(name))
            .ok_or_else(|| ScoutError::Other("No providers registered".to_string()))
    }

    /// Create a client with the Anthropic adapter configured from the environment.
    pub fn from_env() -> Result<Self> {
        let mut client = Self::new();
        client.register_provider(crate::AnthropicAdapter::from_env()?);
        Ok(client.with_middleware(LoggingMiddleware))
    }
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
