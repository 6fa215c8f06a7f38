//! 管理端订单 API Handlers
//!
//! 所有接口要求 ADMIN 角色。

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::OrderWithItems;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub courier: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub reason: String,
}

/// GET /api/admin/orders - 全量订单列表
pub async fn list_all(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    current_user.require_admin()?;
    let orders = state.orders.list_all_orders().await?;
    Ok(Json(orders))
}

/// PATCH /api/admin/orders/:id/mark-paid - 付款确认
pub async fn mark_paid(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderWithItems>> {
    current_user.require_admin()?;
    let order = state.orders.mark_paid(&id).await?;
    Ok(Json(order))
}

/// PATCH /api/admin/orders/:id/dispatch - 发货
pub async fn dispatch(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<DispatchRequest>,
) -> AppResult<Json<OrderWithItems>> {
    current_user.require_admin()?;
    let order = state
        .orders
        .dispatch(
            &id,
            payload.tracking_number.as_deref(),
            payload.courier.as_deref(),
        )
        .await?;
    Ok(Json(order))
}

/// PATCH /api/admin/orders/:id/deliver - 签收
pub async fn deliver(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderWithItems>> {
    current_user.require_admin()?;
    let order = state.orders.mark_delivered(&id).await?;
    Ok(Json(order))
}

/// PATCH /api/admin/orders/:id/cancel - 取消（附原因）
pub async fn cancel(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<OrderWithItems>> {
    current_user.require_admin()?;
    let order = state.orders.cancel(&id, &payload.reason).await?;
    Ok(Json(order))
}
