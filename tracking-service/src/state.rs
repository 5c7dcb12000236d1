//! Application state for tracking service.

use std::sync::Arc;

use common::config::AppConfig;
use common::metrics::InMemoryMetrics;

use crate::generator::TrackingNumberGenerator;
use crate::repository::TrackingRepository;
use crate::service::TrackingService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub service: Arc<TrackingService>,
    pub metrics: Arc<InMemoryMetrics>,
}

impl AppState {
    /// Creates a new application state around an opened record store.
    pub fn new(config: AppConfig, repository: Arc<dyn TrackingRepository>) -> Self {
        let metrics = Arc::new(InMemoryMetrics::new());
        let generator =
            TrackingNumberGenerator::new(config.generator.max_attempts, metrics.clone());
        let service = TrackingService::new(
            generator,
            repository,
            metrics.clone(),
            config.generator.save_conflict_retries,
        );

        Self {
            config,
            service: Arc::new(service),
            metrics,
        }
    }
}
