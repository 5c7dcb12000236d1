//! 物流追踪号生成服务
//!
//! 提供追踪号签发功能，包括：
//! - 请求参数校验
//! - 追踪号生成与唯一性检查（有限次重试）
//! - 签发记录持久化（内存 / MySQL / MongoDB）
//! - 生成、碰撞、失败计数

mod generator;
mod handlers;
mod repository;
mod routes;
mod service;
mod state;

use anyhow::Context;
use axum::{middleware, routing::get, Json, Router};
use common::config::{AppConfig, LogFormat};
use common::middleware::request_id::request_id_middleware;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "tracking-service";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "追踪号服务 API",
        version = "0.1.0",
        description = "物流追踪号生成微服务"
    ),
    paths(
        handlers::next_tracking_number,
        handlers::get_tracking_record,
        handlers::metrics_snapshot,
        handlers::health_check,
    ),
    components(schemas(
        common::models::TrackingRequest,
        common::models::TrackingResponse,
        common::models::TrackingRecord,
        common::models::TrackingNumber,
        handlers::HealthResponse,
        handlers::MetricsResponse,
    )),
    tags(
        (name = "tracking", description = "追踪号端点"),
        (name = "health", description = "健康检查与计数端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 文件可选，环境变量优先
    dotenvy::dotenv().ok();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME).context("加载配置失败")?;

    // 初始化日志追踪
    init_tracing(config.log_format);

    // 打开签发记录存储
    let repository = repository::connect(&config.storage)
        .await
        .context("初始化记录存储失败")?;

    // 创建应用状态
    let state = AppState::new(config.clone(), repository);

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(
        service = SERVICE_NAME,
        address = %addr,
        storage = %config.storage.backend,
        max_attempts = config.generator.max_attempts,
        "启动服务"
    );

    let listener = TcpListener::bind(&addr).await.context("绑定地址失败")?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
