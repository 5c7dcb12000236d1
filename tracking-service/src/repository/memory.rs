//! In-process record store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::errors::{AppError, AppResult};
use common::models::TrackingRecord;
use common::utils::IdGenerator;

use super::{TrackingRepository, UniquenessChecker};

/// Keeps records in a map keyed by tracking number. Lost on restart.
#[derive(Default)]
pub struct MemoryTrackingRepository {
    records: RwLock<HashMap<String, TrackingRecord>>,
}

impl MemoryTrackingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UniquenessChecker for MemoryTrackingRepository {
    async fn exists(&self, tracking_number: &str) -> AppResult<bool> {
        Ok(self.records.read().await.contains_key(tracking_number))
    }
}

#[async_trait]
impl TrackingRepository for MemoryTrackingRepository {
    async fn save(&self, mut record: TrackingRecord) -> AppResult<TrackingRecord> {
        let key = record.tracking_number.as_str().to_string();
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(AppError::DuplicateTrackingNumber(key));
        }
        record.id = Some(IdGenerator::record_id());
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn find(&self, tracking_number: &str) -> AppResult<Option<TrackingRecord>> {
        Ok(self.records.read().await.get(tracking_number).cloned())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.records.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::TrackingNumber;

    fn record(number: &str) -> TrackingRecord {
        TrackingRecord {
            id: None,
            tracking_number: TrackingNumber::parse(number).unwrap(),
            origin_country_id: "US".into(),
            destination_country_id: "CA".into(),
            weight: 2.5,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            customer_id: "c1".into(),
            customer_name: None,
            customer_slug: "acme".into(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_is_visible() {
        let repo = MemoryTrackingRepository::new();
        assert!(!repo.exists("USCAAAAAAAAA").await.unwrap());

        let saved = repo.save(record("USCAAAAAAAAA")).await.unwrap();
        assert!(saved.id.is_some());
        assert!(repo.exists("USCAAAAAAAAA").await.unwrap());
        assert_eq!(repo.find("USCAAAAAAAAA").await.unwrap(), Some(saved));
        assert_eq!(repo.find("USCABBBBBBBB").await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_save_rejected() {
        let repo = MemoryTrackingRepository::new();
        repo.save(record("USCAAAAAAAAA")).await.unwrap();

        let err = repo.save(record("USCAAAAAAAAA")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateTrackingNumber(ref n) if n == "USCAAAAAAAAA"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
