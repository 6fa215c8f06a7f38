//! 通知模块
//!
//! - [`NotificationService`] - 持久化 + 尽力推送
//! - [`Broadcaster`] - 注入的推送能力
//! - [`triggers`] - 业务事件的文案模板

pub mod broadcaster;
pub mod service;
pub mod triggers;

pub use broadcaster::{Broadcaster, BusBroadcaster, NoopBroadcaster};
pub use service::{BUYER_FANOUT_LIMIT, DEFAULT_RETENTION_MILLIS, NotificationService};
