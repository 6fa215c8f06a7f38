//! 管理端订单 API 模块

mod handler;

use axum::{Router, routing::{get, patch}};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_all))
        .route("/{id}/mark-paid", patch(handler::mark_paid))
        .route("/{id}/dispatch", patch(handler::dispatch))
        .route("/{id}/deliver", patch(handler::deliver))
        .route("/{id}/cancel", patch(handler::cancel))
}
