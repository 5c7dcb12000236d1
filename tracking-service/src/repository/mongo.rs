//! MongoDB record store.
//!
//! Documents go to the `tracking_records` collection with camelCase field
//! names. A unique index on `trackingNumber` rejects duplicate inserts.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use common::errors::{AppError, AppResult};
use common::models::{TrackingNumber, TrackingRecord};

use super::{TrackingRepository, UniquenessChecker};

const COLLECTION: &str = "tracking_records";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    tracking_number: String,
    origin_country_id: String,
    destination_country_id: String,
    weight: f64,
    created_at: bson::DateTime,
    customer_id: String,
    customer_name: Option<String>,
    customer_slug: String,
}

impl TrackingDocument {
    fn from_record(record: &TrackingRecord) -> Self {
        Self {
            id: None,
            tracking_number: record.tracking_number.to_string(),
            origin_country_id: record.origin_country_id.clone(),
            destination_country_id: record.destination_country_id.clone(),
            weight: record.weight,
            created_at: bson::DateTime::from_millis(record.created_at.timestamp_millis()),
            customer_id: record.customer_id.clone(),
            customer_name: record.customer_name.clone(),
            customer_slug: record.customer_slug.clone(),
        }
    }

    fn into_record(self) -> AppResult<TrackingRecord> {
        let tracking_number = TrackingNumber::parse(self.tracking_number.clone()).ok_or_else(|| {
            AppError::Persistence(format!(
                "stored tracking number is malformed: {}",
                self.tracking_number
            ))
        })?;
        let created_at: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.created_at.timestamp_millis())
            .single()
            .ok_or_else(|| AppError::Persistence("stored createdAt is out of range".into()))?;
        Ok(TrackingRecord {
            id: self.id.map(|oid| oid.to_hex()),
            tracking_number,
            origin_country_id: self.origin_country_id,
            destination_country_id: self.destination_country_id,
            weight: self.weight,
            created_at,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_slug: self.customer_slug,
        })
    }
}

/// Tracking records persisted in MongoDB.
pub struct MongoTrackingRepository {
    collection: Collection<TrackingDocument>,
}

impl MongoTrackingRepository {
    /// Connects to `uri`, selects `database` and makes sure the unique index exists.
    pub async fn connect(uri: &str, database: &str) -> AppResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to MongoDB: {}", e)))?;
        let repo = Self {
            collection: client.database(database).collection(COLLECTION),
        };
        repo.ensure_index().await?;
        Ok(repo)
    }

    async fn ensure_index(&self) -> AppResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "trackingNumber": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to create index: {}", e)))?;

        tracing::info!(collection = COLLECTION, "Unique index on `trackingNumber` ensured");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl UniquenessChecker for MongoTrackingRepository {
    async fn exists(&self, tracking_number: &str) -> AppResult<bool> {
        let count = self
            .collection
            .count_documents(doc! { "trackingNumber": tracking_number })
            .await
            .map_err(|e| AppError::UniquenessCheck(e.to_string()))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TrackingRepository for MongoTrackingRepository {
    async fn save(&self, mut record: TrackingRecord) -> AppResult<TrackingRecord> {
        let document = TrackingDocument::from_record(&record);
        let result = self.collection.insert_one(&document).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::DuplicateTrackingNumber(record.tracking_number.to_string())
            } else {
                AppError::Persistence(e.to_string())
            }
        })?;

        record.id = result.inserted_id.as_object_id().map(|oid| oid.to_hex());
        tracing::info!(
            id = ?record.id,
            tracking_number = %record.tracking_number,
            "tracking record saved to MongoDB"
        );
        Ok(record)
    }

    async fn find(&self, tracking_number: &str) -> AppResult<Option<TrackingRecord>> {
        self.collection
            .find_one(doc! { "trackingNumber": tracking_number })
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?
            .map(TrackingDocument::into_record)
            .transpose()
    }

    async fn count(&self) -> AppResult<u64> {
        self.collection
            .estimated_document_count()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_round_trips_record_fields() {
        let record = TrackingRecord {
            id: None,
            tracking_number: TrackingNumber::parse("USCA7QX2M4AB").unwrap(),
            origin_country_id: "US".into(),
            destination_country_id: "CA".into(),
            weight: 2.5,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            customer_id: "c1".into(),
            customer_name: Some("Acme".into()),
            customer_slug: "acme".into(),
        };

        let mut document = TrackingDocument::from_record(&record);
        let oid = ObjectId::new();
        document.id = Some(oid);

        let restored = document.into_record().unwrap();
        assert_eq!(restored.id, Some(oid.to_hex()));
        assert_eq!(TrackingRecord { id: None, ..restored }, record);
    }

    #[test]
    fn test_document_uses_camel_case_fields() {
        let document = TrackingDocument {
            id: None,
            tracking_number: "USCA7QX2M4AB".into(),
            origin_country_id: "US".into(),
            destination_country_id: "CA".into(),
            weight: 1.0,
            created_at: bson::DateTime::from_millis(0),
            customer_id: "c1".into(),
            customer_name: None,
            customer_slug: "acme".into(),
        };
        let bson_doc = bson::to_document(&document).unwrap();
        assert!(bson_doc.contains_key("trackingNumber"));
        assert!(bson_doc.contains_key("originCountryId"));
        assert!(!bson_doc.contains_key("_id"));
    }
}
