//! Order Server - B2B 批发订货平台的订单与通知服务
//!
//! # 架构概述
//!
//! - **库存账本** (`stock`): stock / reserved_stock 的唯一修改入口
//! - **订单状态机** (`orders`): 创建、付款、发货、签收、取消 + 过期清扫
//! - **通知** (`notify`): 持久化 + 尽力推送，管理员/买家 fan-out
//! - **消息总线** (`message`): 进程内广播，连线传输由外部协作方订阅
//! - **HTTP API** (`api`): RESTful 接口，主体由网关注入
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── auth/          # 受信主体提取
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 连接池、模型、仓库
//! ├── stock/         # 库存账本
//! ├── orders/        # 订单状态机、清扫
//! ├── notify/        # 通知服务、推送、触发器
//! ├── message/       # 进程内消息总线
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod message;
pub mod notify;
pub mod orders;
pub mod stock;
pub mod utils;

// Re-export 公共类型
pub use auth::CurrentUser;
pub use core::{Config, Server, ServerState};
pub use message::MessageBus;
pub use notify::{Broadcaster, NotificationService};
pub use orders::{OrderError, OrderLifecycle};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
