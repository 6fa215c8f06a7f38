//! 核心模块
//!
//! - [`Config`] - 环境变量配置
//! - [`ServerState`] - 服务单例集合
//! - [`Server`] - HTTP 服务器
//! - [`tasks`] - 后台任务注册与关闭

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
