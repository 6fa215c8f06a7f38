//! 买家订单 API 模块

mod handler;

use axum::{Router, routing::{get, post}};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list_own))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/payment-proof", post(handler::upload_payment_proof))
}
