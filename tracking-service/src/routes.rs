//! 路由模块

use axum::{routing::get, Router};
use crate::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/next-tracking-number", get(handlers::next_tracking_number))
        .route(
            "/api/tracking-records/{tracking_number}",
            get(handlers::get_tracking_record),
        )
        .route("/api/metrics", get(handlers::metrics_snapshot))
        .route("/api/health", get(handlers::health_check))
}
