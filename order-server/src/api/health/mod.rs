//! 健康检查

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// GET /api/health - 进程存活 + 数据库连通性 + 总线订阅数
async fn health(State(state): State<ServerState>) -> AppResult<Json<Value>> {
    sqlx::query("SELECT 1")
        .execute(&state.db.pool)
        .await
        .map_err(|e| crate::utils::AppError::database(e.to_string()))?;

    Ok(Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "busSubscribers": state.bus.subscriber_count(),
    })))
}
