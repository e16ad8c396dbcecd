//! Shared application state for the relay gateway.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::obs::RelayMetrics;
use crate::realtime::Registry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RelayConfig,
    registry: Arc<Registry>,
    metrics: Arc<RelayMetrics>,
}

impl AppState {
    pub fn new(cfg: RelayConfig) -> Self {
        let metrics = Arc::new(RelayMetrics::default());
        let registry = Arc::new(Registry::new(Arc::clone(&metrics)));
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
            }),
        }
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Point-in-time values rendered after the registered metrics.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("wsrelay_registry_members", self.inner.registry.len() as u64)]
    }
}
