use async_trait::async_trait;
use scout_types::Result;

use crate::{Request, Response};

/// A single LLM backend that turns a unified [`Request`] into a [`Response`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, request: &Request) -> Result<Response>;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
}

/// Type-erased provider, so adapters of different types share one map.
pub struct DynProvider(Box<dyn ProviderAdapter>);

impl DynProvider {
    pub fn new(provider: impl ProviderAdapter + 'static) -> Self {
        Self(Box::new(provider))
    }

    pub async fn complete(&self, request: &Request) -> Result<Response> {
        self.0.complete(request).await
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn default_model(&self) -> &str {
        self.0.default_model()
    }
}
