//! 通知 API 模块

mod handler;

use axum::{Router, routing::{delete, get, patch}};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/notifications", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/unread-count", get(handler::unread_count))
        .route("/read-all", patch(handler::mark_all_read))
        .route("/{id}/read", patch(handler::mark_read))
        .route("/{id}", delete(handler::delete))
}
