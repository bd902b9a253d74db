//! Dependency probes behind `GET /api/health`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::Transport;
use crate::embedding::EmbeddingStore;
use crate::vectordb::VectorTier;

/// One external dependency the health endpoint reports on.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Key in the `services` map of the health response.
    fn name(&self) -> &'static str;

    /// Whether a disconnected probe turns the response into a 503.
    fn required(&self) -> bool {
        true
    }

    async fn is_healthy(&self) -> bool;
}

pub struct TierProbe<T> {
    name: &'static str,
    tier: Arc<T>,
}

impl<T> TierProbe<T> {
    pub fn new(name: &'static str, tier: Arc<T>) -> Self {
        Self { name, tier }
    }
}

#[async_trait]
impl<T: VectorTier + 'static> HealthProbe for TierProbe<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_healthy(&self) -> bool {
        self.tier.is_ready().await
    }
}

/// Probe over an embedding store; optional stores never fail the check.
pub struct StoreProbe<S> {
    name: &'static str,
    store: Arc<S>,
    required: bool,
}

impl<S> StoreProbe<S> {
    pub fn new(name: &'static str, store: Arc<S>) -> Self {
        Self {
            name,
            store,
            required: true,
        }
    }

    pub fn optional(name: &'static str, store: Arc<S>) -> Self {
        Self {
            name,
            store,
            required: false,
        }
    }
}

#[async_trait]
impl<S: EmbeddingStore + 'static> HealthProbe for StoreProbe<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn required(&self) -> bool {
        self.required
    }

    async fn is_healthy(&self) -> bool {
        self.store.is_healthy().await
    }
}

pub struct TransportProbe {
    name: &'static str,
    transport: Arc<dyn Transport>,
}

impl TransportProbe {
    pub fn new(name: &'static str, transport: Arc<dyn Transport>) -> Self {
        Self { name, transport }
    }
}

#[async_trait]
impl HealthProbe for TransportProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }
}
