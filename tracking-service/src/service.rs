//! 追踪号签发服务模块

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use common::errors::{AppError, AppResult};
use common::metrics::{
    MetricsRecorder, TRACKING_NUMBER_COLLISION, TRACKING_NUMBER_FAILURE,
    TRACKING_NUMBER_GENERATED,
};
use common::models::{TrackingRecord, TrackingRequest, TrackingResponse};
use common::utils::RequestValidator;

use crate::generator::TrackingNumberGenerator;
use crate::repository::TrackingRepository;

/// 追踪号签发服务
///
/// 校验请求 → 生成追踪号 → 构造记录 → 持久化。存储层唯一索引冲突视为碰撞，
/// 重新生成，次数受 `save_conflict_retries` 限制。
pub struct TrackingService {
    generator: TrackingNumberGenerator,
    repository: Arc<dyn TrackingRepository>,
    metrics: Arc<dyn MetricsRecorder>,
    save_conflict_retries: u32,
}

impl TrackingService {
    /// 创建新的签发服务实例
    pub fn new(
        generator: TrackingNumberGenerator,
        repository: Arc<dyn TrackingRepository>,
        metrics: Arc<dyn MetricsRecorder>,
        save_conflict_retries: u32,
    ) -> Self {
        Self {
            generator,
            repository,
            metrics,
            save_conflict_retries,
        }
    }

    pub fn repository(&self) -> &Arc<dyn TrackingRepository> {
        &self.repository
    }

    /// 签发新的追踪号并保存记录
    pub async fn generate_tracking_number(
        &self,
        request: TrackingRequest,
    ) -> AppResult<TrackingResponse> {
        tracing::info!(request = ?request, "received request to generate tracking number");

        match self.issue(&request).await {
            Ok(response) => Ok(response),
            Err(e @ (AppError::InvalidRequest { .. }
            | AppError::TimestampParse(_)
            | AppError::GenerationExhausted { .. }
            | AppError::UniquenessCheck(_)
            | AppError::Persistence(_))) => {
                tracing::error!(error = %e, "failed to generate tracking number");
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "unexpected error while generating tracking number");
                Err(match e {
                    AppError::Generation(_) => e,
                    other => AppError::Generation(other.to_string()),
                })
            }
        }
    }

    async fn issue(&self, request: &TrackingRequest) -> AppResult<TrackingResponse> {
        let validated = RequestValidator::validate(request)?;

        let mut conflicts = 0;
        loop {
            let tracking_number = self
                .generator
                .generate(&validated, self.repository.as_ref())
                .await?;
            tracing::info!(tracking_number = %tracking_number, "generated tracking number");

            let record = TrackingRecord::new(&validated, tracking_number)?;

            match self.repository.save(record).await {
                Ok(saved) => {
                    self.metrics.increment(
                        TRACKING_NUMBER_GENERATED,
                        &[
                            ("origin", saved.origin_country_id.as_str()),
                            ("destination", saved.destination_country_id.as_str()),
                        ],
                    );
                    tracing::info!(
                        id = ?saved.id,
                        tracking_number = %saved.tracking_number,
                        "tracking record saved"
                    );
                    return Ok(TrackingResponse {
                        tracking_number: saved.tracking_number.into_inner(),
                        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    });
                }
                Err(AppError::DuplicateTrackingNumber(number)) => {
                    self.metrics.increment(TRACKING_NUMBER_COLLISION, &[]);
                    if conflicts >= self.save_conflict_retries {
                        self.metrics.increment(TRACKING_NUMBER_FAILURE, &[]);
                        tracing::error!(
                            tracking_number = %number,
                            conflicts,
                            "tracking number taken at save time, giving up"
                        );
                        return Err(AppError::GenerationExhausted {
                            attempts: conflicts + 1,
                        });
                    }
                    conflicts += 1;
                    tracing::warn!(
                        tracking_number = %number,
                        conflicts,
                        "tracking number taken at save time, regenerating"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to save tracking record");
                    return Err(match e {
                        AppError::Persistence(_) => e,
                        other => AppError::Persistence(other.to_string()),
                    });
                }
            }
        }
    }
}
