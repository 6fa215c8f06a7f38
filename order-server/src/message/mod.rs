//! 实时消息模块
//!
//! 进程内消息总线。对外的连线传输（WebSocket 等）属于外部协作方，
//! 通过订阅总线接入，按 `Recipient::matches` 过滤后投递。

pub mod bus;

pub use bus::MessageBus;
