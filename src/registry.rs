//! Adapter plugin registry

use crate::config::Route;
use crate::errors::{AdapterError, Result};
use crate::telemetry::RawLogRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Counters reported by a stream once its channel is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Records taken off the channel
    pub received: u64,
    /// Records that were not forwardable
    pub filtered: u64,
    /// Envelopes written to the sink list
    pub shipped: u64,
    /// Shipped envelopes whose follow-up PUBLISH failed
    pub unpublished: u64,
    /// Forwardable records that never reached the list
    pub dropped: u64,
    /// Error lines emitted; suppressed failures are not counted
    pub errors_logged: u64,
}

/// A running destination that drains a record channel
#[async_trait]
pub trait LogAdapter: Send + Sync {
    /// Consume records until the sender side is closed
    async fn stream(&self, logstream: mpsc::Receiver<RawLogRecord>) -> StreamStats;
}

/// Builds adapters for routes of one scheme
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(&self, route: &Route) -> Result<Box<dyn LogAdapter>>;
}

/// Scheme → factory table, filled in by the composition root
#[derive(Default)]
pub struct AdapterRegistry {
    factories: HashMap<String, Arc<dyn AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scheme: &str, factory: Arc<dyn AdapterFactory>) {
        if self.factories.insert(scheme.to_string(), factory).is_some() {
            warn!("Replacing adapter factory for scheme '{}'", scheme);
        } else {
            debug!("Registered adapter factory for scheme '{}'", scheme);
        }
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Build an adapter for `route` using the factory registered for its scheme
    pub async fn create(&self, route: &Route) -> Result<Box<dyn LogAdapter>> {
        let factory = self
            .factories
            .get(&route.adapter)
            .ok_or_else(|| AdapterError::UnknownAdapter(route.adapter.clone()))?;

        factory.create(route).await
    }
}
