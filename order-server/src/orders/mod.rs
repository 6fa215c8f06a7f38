//! 订单域
//!
//! - [`lifecycle`] - 状态机和订单操作
//! - [`sweeper`] - 预留过期的定时清扫
//! - [`money`] / [`number`] - 金额与订单号辅助

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod number;
pub mod sweeper;

pub use error::{OrderError, OrderResult};
pub use lifecycle::{CreateOrderItem, OrderLifecycle};

#[cfg(test)]
mod tests;
