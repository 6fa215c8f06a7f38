//! 通知 API Handlers
//!
//! 所有接口只操作本人的通知行。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::Notification;
use crate::utils::{AppError, AppResult};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub notifications: Vec<Notification>,
    pub total: i64,
}

/// GET /api/notifications - 本人通知分页
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    let (notifications, total) = state
        .notifications
        .list_for_user(
            &current_user.user_id,
            limit,
            offset,
            query.unread_only.unwrap_or(false),
        )
        .await?;
    Ok(Json(ListResponse {
        notifications,
        total,
    }))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let count = state
        .notifications
        .unread_count(&current_user.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "unreadCount": count })))
}

/// PATCH /api/notifications/:id/read - 标记已读（幂等）
pub async fn mark_read(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let found = state
        .notifications
        .mark_read(&id, &current_user.user_id)
        .await?;
    if !found {
        return Err(AppError::not_found(format!("Notification {id} not found")));
    }
    Ok(Json(true))
}

/// PATCH /api/notifications/read-all - 全部标记已读（幂等）
pub async fn mark_all_read(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let changed = state
        .notifications
        .mark_all_read(&current_user.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "markedRead": changed })))
}

/// DELETE /api/notifications/:id
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let deleted = state
        .notifications
        .delete(&id, &current_user.user_id)
        .await?;
    if !deleted {
        return Err(AppError::not_found(format!("Notification {id} not found")));
    }
    Ok(Json(true))
}
