//! MySQL record store.
//!
//! Records live in the `tracking_records` table. A UNIQUE key on
//! `tracking_number` makes the insert the authoritative uniqueness check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use common::errors::{AppError, AppResult};
use common::models::{TrackingNumber, TrackingRecord};
use common::utils::IdGenerator;

use super::{TrackingRepository, UniquenessChecker};

/// Row from the `tracking_records` table.
#[derive(sqlx::FromRow)]
struct TrackingRow {
    id: String,
    tracking_number: String,
    origin_country_id: String,
    destination_country_id: String,
    weight: f64,
    created_at: DateTime<Utc>,
    customer_id: String,
    customer_name: Option<String>,
    customer_slug: String,
}

impl TrackingRow {
    fn into_record(self) -> AppResult<TrackingRecord> {
        let tracking_number = TrackingNumber::parse(self.tracking_number.clone()).ok_or_else(|| {
            AppError::Persistence(format!(
                "stored tracking number is malformed: {}",
                self.tracking_number
            ))
        })?;
        Ok(TrackingRecord {
            id: Some(self.id),
            tracking_number,
            origin_country_id: self.origin_country_id,
            destination_country_id: self.destination_country_id,
            weight: self.weight,
            created_at: self.created_at,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_slug: self.customer_slug,
        })
    }
}

/// Tracking records persisted in MySQL.
pub struct MySqlTrackingRepository {
    pool: MySqlPool,
}

impl MySqlTrackingRepository {
    /// Connects to `url` and makes sure the table exists.
    pub async fn connect(url: &str) -> AppResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to MySQL: {}", e)))?;
        let repo = Self { pool };
        repo.ensure_table().await?;
        Ok(repo)
    }

    /// Creates the tracking_records table if it does not exist.
    async fn ensure_table(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS `tracking_records` (
                `id`                     VARCHAR(64)   NOT NULL,
                `tracking_number`        VARCHAR(16)   NOT NULL,
                `origin_country_id`      CHAR(2)       NOT NULL,
                `destination_country_id` CHAR(2)       NOT NULL,
                `weight`                 DOUBLE        NOT NULL,
                `created_at`             DATETIME(6)   NOT NULL,
                `customer_id`            VARCHAR(128)  NOT NULL,
                `customer_name`          VARCHAR(255)  DEFAULT NULL,
                `customer_slug`          VARCHAR(128)  NOT NULL,
                PRIMARY KEY (`id`),
                UNIQUE KEY `uk_tracking_number` (`tracking_number`),
                KEY `idx_customer_id` (`customer_id`)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to create tracking_records table: {}", e))
        })?;

        tracing::info!("Table `tracking_records` ensured");
        Ok(())
    }
}

#[async_trait]
impl UniquenessChecker for MySqlTrackingRepository {
    async fn exists(&self, tracking_number: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM `tracking_records` WHERE `tracking_number` = ?",
        )
        .bind(tracking_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::UniquenessCheck(e.to_string()))?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TrackingRepository for MySqlTrackingRepository {
    async fn save(&self, mut record: TrackingRecord) -> AppResult<TrackingRecord> {
        let id = IdGenerator::record_id();

        sqlx::query(
            "INSERT INTO `tracking_records` (`id`, `tracking_number`, `origin_country_id`, `destination_country_id`,
                `weight`, `created_at`, `customer_id`, `customer_name`, `customer_slug`)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(record.tracking_number.as_str())
        .bind(&record.origin_country_id)
        .bind(&record.destination_country_id)
        .bind(record.weight)
        .bind(record.created_at)
        .bind(&record.customer_id)
        .bind(&record.customer_name)
        .bind(&record.customer_slug)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::DuplicateTrackingNumber(record.tracking_number.to_string())
            }
            other => AppError::Persistence(other.to_string()),
        })?;

        tracing::info!(id = %id, tracking_number = %record.tracking_number, "tracking record saved to MySQL");
        record.id = Some(id);
        Ok(record)
    }

    async fn find(&self, tracking_number: &str) -> AppResult<Option<TrackingRecord>> {
        let row: Option<TrackingRow> = sqlx::query_as(
            "SELECT `id`, `tracking_number`, `origin_country_id`, `destination_country_id`,
                    `weight`, `created_at`, `customer_id`, `customer_name`, `customer_slug`
             FROM `tracking_records` WHERE `tracking_number` = ?",
        )
        .bind(tracking_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

        row.map(TrackingRow::into_record).transpose()
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM `tracking_records`")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
