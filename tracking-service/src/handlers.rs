//! Handler模块

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::{TrackingNumber, TrackingRecord, TrackingRequest, TrackingResponse};
use common::response::ApiResponse;
use crate::state::AppState;

const SERVICE_NAME: &str = "tracking-service";

/// 生成下一个追踪号
#[utoipa::path(
    get,
    path = "/api/next-tracking-number",
    tag = "tracking",
    params(TrackingRequest),
    responses(
        (status = 200, description = "追踪号已签发", body = TrackingResponse),
        (status = 400, description = "请求参数无效或 createdAt 无法解析"),
        (status = 503, description = "重试次数内未能生成唯一追踪号"),
        (status = 500, description = "存储或内部错误")
    )
)]
pub async fn next_tracking_number(
    State(state): State<AppState>,
    query: Result<Query<TrackingRequest>, QueryRejection>,
) -> Result<Json<TrackingResponse>, AppError> {
    let Query(request) = query.map_err(|e| AppError::invalid("request", e.body_text()))?;
    let response = state.service.generate_tracking_number(request).await?;
    Ok(Json(response))
}

/// 根据追踪号查询签发记录
#[utoipa::path(
    get,
    path = "/api/tracking-records/{tracking_number}",
    tag = "tracking",
    params(
        ("tracking_number" = String, Path, description = "追踪号")
    ),
    responses(
        (status = 200, description = "签发记录", body = ApiResponse<TrackingRecord>),
        (status = 400, description = "追踪号格式无效"),
        (status = 404, description = "追踪号未找到")
    )
)]
pub async fn get_tracking_record(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<ApiResponse<TrackingRecord>>, AppError> {
    if !TrackingNumber::is_valid_format(&tracking_number) {
        return Err(AppError::invalid(
            "tracking_number",
            "must match ^[A-Z0-9]{1,16}$",
        ));
    }
    let record = state
        .service
        .repository()
        .find(&tracking_number)
        .await?
        .ok_or_else(|| AppError::NotFound(tracking_number.clone()))?;
    Ok(Json(ApiResponse::ok_with_service(record, SERVICE_NAME)))
}

/// 计数器快照
#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "health",
    responses(
        (status = 200, description = "全部计数器", body = ApiResponse<MetricsResponse>)
    )
)]
pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<ApiResponse<MetricsResponse>> {
    Json(ApiResponse::ok_with_service(
        MetricsResponse {
            counters: state.metrics.snapshot(),
        },
        SERVICE_NAME,
    ))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let records = match state.service.repository().count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "record store unavailable during health check");
            None
        }
    };

    Json(HealthResponse {
        status: if records.is_some() { "healthy" } else { "degraded" }.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        storage: state.config.storage.backend.to_string(),
        records,
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub storage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct MetricsResponse {
    /// Counter values keyed by `name{label=value,...}`.
    pub counters: BTreeMap<String, u64>,
}
