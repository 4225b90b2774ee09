//! # Application State
//!
//! Shared state for the Axum application, handed to every handler through
//! the `State` extractor. The store behind the service is chosen at startup:
//! Postgres when `DATABASE_URL` is set, the in-memory store otherwise.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use permits_core::Timestamp;
use permits_state::default_catalog;

use crate::config::AppConfig;
use crate::service::PermitService;
use crate::store::{MemoryStore, PermitStore};

#[derive(Debug, Clone)]
pub struct AppState {
    pub service: PermitService,
    pub config: Arc<AppConfig>,
    /// Renders `/metrics`. `None` when no recorder was installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn with_store(store: Arc<dyn PermitStore>, config: AppConfig) -> Self {
        Self {
            service: PermitService::new(store),
            config: Arc::new(config),
            metrics: None,
        }
    }

    /// In-memory state seeded with the default county catalog.
    pub fn in_memory(config: AppConfig) -> Self {
        tracing::debug!(at = %Timestamp::now(), "seeding in-memory store with default catalog");
        Self::with_store(Arc::new(MemoryStore::with_catalog(default_catalog())), config)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
