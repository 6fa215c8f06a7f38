//! 买家订单 API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::OrderWithItems;
use crate::orders::CreateOrderItem;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItem>,
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProofRequest {
    /// 文件存储协作方返回的不透明引用
    pub proof_url: String,
}

/// POST /api/orders - 下单（已审核买家）
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderWithItems>> {
    let order = state
        .orders
        .create_order(
            &current_user.user_id,
            &payload.items,
            &payload.shipping_address,
            payload.payment_method.as_deref(),
        )
        .await?;
    Ok(Json(order))
}

/// GET /api/orders - 本人订单列表
pub async fn list_own(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    let orders = state.orders.list_user_orders(&current_user.user_id).await?;
    Ok(Json(orders))
}

/// GET /api/orders/:id - 本人或管理员
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<OrderWithItems>> {
    let order = state
        .orders
        .get_order(&id, &current_user.user_id, current_user.is_admin())
        .await?;
    Ok(Json(order))
}

/// POST /api/orders/:id/payment-proof - 上传付款凭证引用
pub async fn upload_payment_proof(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<PaymentProofRequest>,
) -> AppResult<Json<OrderWithItems>> {
    let order = state
        .orders
        .upload_payment_proof(&id, &current_user.user_id, &payload.proof_url)
        .await?;
    Ok(Json(order))
}
