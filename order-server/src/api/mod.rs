//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 买家订单接口
//! - [`admin_orders`] - 管理端订单接口
//! - [`notifications`] - 通知接口

pub mod admin_orders;
pub mod health;
pub mod notifications;
pub mod orders;
