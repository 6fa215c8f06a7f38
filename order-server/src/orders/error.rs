//! 订单域错误
//!
//! 业务拒绝一律是带上下文的封闭变体，HTTP 映射见 `utils::error`。

use crate::db::models::OrderStatus;
use crate::db::repository::RepoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    /// 商品不存在或已下架
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    /// 可售库存不足，携带商品名和当前可售量
    #[error("Insufficient stock for {name}: {available} available")]
    InsufficientStock { name: String, available: i64 },

    /// 空订单
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// 数量非法（非正数或超出单行上限）
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// 状态机守卫拒绝
    #[error("Invalid transition: {current} -> {attempted}")]
    InvalidTransition {
        current: OrderStatus,
        attempted: OrderStatus,
    },

    /// 非本人且非管理员
    #[error("Not authorized")]
    NotAuthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// 库存账本不变式被破坏，属服务端 bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::Database(err.to_string())
    }
}

impl From<RepoError> for OrderError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => OrderError::NotFound(msg),
            other => OrderError::Database(other.to_string()),
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
