//! 预留过期清扫
//!
//! 周期任务：找出 `stock_reserved_until` 已过期的待付款订单，
//! 逐个走 [`OrderLifecycle::cancel`]。取消路径唯一，人工转换和
//! 清扫竞争时守卫更新保证只有一个赢家，输家是 no-op，
//! 绝不会二次释放库存。

use std::time::Duration;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use super::lifecycle::{EXPIRY_REASON, OrderLifecycle};
use super::OrderError;
use crate::db::repository::order as order_repo;

/// 默认每 300 秒扫一轮
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// 预留过期清扫器
///
/// 注册为 Periodic 任务，在 `start_background_tasks()` 中启动。
pub struct ReservationSweeper {
    pool: SqlitePool,
    lifecycle: OrderLifecycle,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReservationSweeper {
    pub fn new(
        pool: SqlitePool,
        lifecycle: OrderLifecycle,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            lifecycle,
            interval,
            shutdown,
        }
    }

    /// 主循环：先睡后扫，收到 shutdown 信号退出
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Reservation sweeper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Reservation sweeper received shutdown signal");
                    return;
                }
            }

            match self.sweep_once().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(cancelled = n, "expired reservations swept"),
                Err(e) => tracing::error!(error = %e, "reservation sweep failed"),
            }
        }
    }

    /// 扫一轮，返回本轮取消的订单数
    pub async fn sweep_once(&self) -> Result<usize, OrderError> {
        let now = shared::util::now_millis();
        let ids = order_repo::find_expired_pending_ids(&self.pool, now).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut cancelled = 0;
        for id in &ids {
            match self.lifecycle.cancel(id, EXPIRY_REASON).await {
                Ok(_) => cancelled += 1,
                // 并发的人工转换抢先了，这单不归清扫管
                Err(OrderError::InvalidTransition { current, .. }) => {
                    tracing::debug!(order_id = %id, %current, "sweep lost transition race");
                }
                Err(OrderError::NotFound(_)) => {
                    tracing::debug!(order_id = %id, "order gone before sweep");
                }
                Err(e) => {
                    tracing::error!(order_id = %id, error = %e, "sweep cancel failed");
                }
            }
        }
        Ok(cancelled)
    }
}
