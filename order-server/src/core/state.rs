use std::sync::Arc;
use std::time::Duration;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::Config;
use crate::db::DbService;
use crate::message::MessageBus;
use crate::notify::{BusBroadcaster, NotificationService};
use crate::orders::sweeper::ReservationSweeper;
use crate::orders::OrderLifecycle;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | SQLite 连接池 |
/// | bus | 进程内消息总线 |
/// | notifications | 通知服务 |
/// | orders | 订单状态机 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub bus: MessageBus,
    pub notifications: NotificationService,
    pub orders: OrderLifecycle,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 顺序：数据库（建池 + 迁移）→ 消息总线 → 通知服务 → 订单状态机
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path).await?;
        let bus = MessageBus::new();
        let broadcaster = Arc::new(BusBroadcaster::new(bus.clone()));
        let notifications = NotificationService::new(db.pool.clone(), broadcaster)
            .with_retention(config.notification_retention_millis());
        let orders = OrderLifecycle::new(db.pool.clone(), notifications.clone());

        Ok(Self {
            config: config.clone(),
            db,
            bus,
            notifications,
            orders,
        })
    }

    /// 注册后台任务，必须在 `Server::run()` 之前调用
    ///
    /// - 预留过期清扫（Periodic）
    /// - 过期通知清理（Periodic）
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let sweeper = ReservationSweeper::new(
            self.db.pool.clone(),
            self.orders.clone(),
            Duration::from_secs(self.config.sweep_interval_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("reservation_sweeper", TaskKind::Periodic, async move {
            sweeper.run().await;
        });

        let notifications = self.notifications.clone();
        let interval = Duration::from_secs(self.config.notification_cleanup_interval_secs);
        let shutdown = tasks.shutdown_token();
        tasks.spawn("notification_cleanup", TaskKind::Periodic, async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.cancelled() => {
                        tracing::info!("Notification cleanup received shutdown signal");
                        return;
                    }
                }
                if let Err(e) = notifications.cleanup_expired().await {
                    tracing::error!(error = %e, "notification cleanup failed");
                }
            }
        });

        tasks.log_summary();
    }
}
