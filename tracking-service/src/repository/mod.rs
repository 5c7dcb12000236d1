//! Tracking record persistence.
//!
//! The generator only needs [`UniquenessChecker`]; the service also saves
//! through [`TrackingRepository`]. Every backend enforces uniqueness of the
//! tracking number itself and reports a violation as
//! `AppError::DuplicateTrackingNumber`.

mod memory;
mod mongo;
mod mysql;

use std::sync::Arc;

use async_trait::async_trait;

use common::config::{StorageBackend, StorageConfig};
use common::errors::{AppError, AppResult};
use common::models::TrackingRecord;

pub use memory::MemoryTrackingRepository;
pub use mongo::MongoTrackingRepository;
pub use mysql::MySqlTrackingRepository;

/// Existence check against previously issued tracking numbers.
#[async_trait]
pub trait UniquenessChecker: Send + Sync {
    /// Whether `tracking_number` was already issued.
    async fn exists(&self, tracking_number: &str) -> AppResult<bool>;
}

/// Store for issued tracking records.
#[async_trait]
pub trait TrackingRepository: UniquenessChecker {
    /// Persists a new record and returns it with its store-assigned id.
    ///
    /// # Errors
    /// - `AppError::DuplicateTrackingNumber` if the number is already stored.
    /// - `AppError::Persistence` for any other store failure.
    async fn save(&self, record: TrackingRecord) -> AppResult<TrackingRecord>;

    /// Looks up a record by tracking number.
    async fn find(&self, tracking_number: &str) -> AppResult<Option<TrackingRecord>>;

    /// Number of stored records.
    async fn count(&self) -> AppResult<u64>;
}

/// Opens the backend selected in `config`.
pub async fn connect(config: &StorageConfig) -> AppResult<Arc<dyn TrackingRepository>> {
    let repository: Arc<dyn TrackingRepository> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryTrackingRepository::new()),
        StorageBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Config("DATABASE_URL is not set".into()))?;
            Arc::new(MySqlTrackingRepository::connect(url).await?)
        }
        StorageBackend::MongoDb => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| AppError::Config("MONGODB_URI is not set".into()))?;
            Arc::new(MongoTrackingRepository::connect(uri, &config.mongodb_database).await?)
        }
    };
    tracing::info!(backend = %config.backend, "tracking record store ready");
    Ok(repository)
}
