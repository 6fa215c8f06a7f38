//! 通知服务
//!
//! 持久化优先：先写行，再尽力推送。推送失败不影响结果，
//! 客户端重连后以数据库里的行为准。

use std::sync::Arc;

use serde_json::Value;
use shared::message::{RoleGroup, event};
use sqlx::SqlitePool;

use super::Broadcaster;
use crate::db::models::{NewNotification, Notification, NotificationType, Priority};
use crate::db::repository::{RepoResult, notification as notification_repo, user as user_repo};

/// 默认保留 30 天
pub const DEFAULT_RETENTION_MILLIS: i64 = 30 * 24 * 60 * 60 * 1000;

/// 广播型买家 fan-out 上限
pub const BUYER_FANOUT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct NotificationService {
    pool: SqlitePool,
    broadcaster: Arc<dyn Broadcaster>,
    retention_millis: i64,
}

impl NotificationService {
    pub fn new(pool: SqlitePool, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            pool,
            broadcaster,
            retention_millis: DEFAULT_RETENTION_MILLIS,
        }
    }

    pub fn with_retention(mut self, retention_millis: i64) -> Self {
        self.retention_millis = retention_millis;
        self
    }

    /// 创建单条通知并推送给接收者
    pub async fn create(&self, input: NewNotification) -> RepoResult<Notification> {
        let row = notification_repo::insert(&self.pool, &input, self.retention_millis).await?;
        self.push_row(&row).await;
        Ok(row)
    }

    /// 管理员 fan-out：每个管理员一行（已读状态独立），外加一次组推送
    pub async fn create_for_admins(
        &self,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        data: Option<Value>,
        priority: Priority,
        group_event: &str,
    ) -> RepoResult<Vec<Notification>> {
        let admins = user_repo::find_admins(&self.pool).await?;
        let mut rows = Vec::with_capacity(admins.len());
        for admin in &admins {
            let mut input =
                NewNotification::new(&admin.id, notification_type, title, message)
                    .with_priority(priority);
            if let Some(d) = &data {
                input = input.with_data(d.clone());
            }
            rows.push(notification_repo::insert(&self.pool, &input, self.retention_millis).await?);
        }

        let payload = data.unwrap_or_else(|| serde_json::json!({}));
        self.broadcaster
            .send_to_group(RoleGroup::Admins, group_event, payload)
            .await;
        tracing::info!(target: "notify", count = rows.len(), title, "admin fan-out");
        Ok(rows)
    }

    /// 已审核买家 fan-out，上限 [`BUYER_FANOUT_LIMIT`]
    pub async fn create_for_approved_buyers(
        &self,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        data: Option<Value>,
        priority: Priority,
        group_event: &str,
    ) -> RepoResult<Vec<Notification>> {
        let buyers = user_repo::find_approved_buyers(&self.pool, BUYER_FANOUT_LIMIT).await?;
        let mut rows = Vec::with_capacity(buyers.len());
        for buyer in &buyers {
            let mut input =
                NewNotification::new(&buyer.id, notification_type, title, message)
                    .with_priority(priority);
            if let Some(d) = &data {
                input = input.with_data(d.clone());
            }
            rows.push(notification_repo::insert(&self.pool, &input, self.retention_millis).await?);
        }

        let payload = data.unwrap_or_else(|| serde_json::json!({}));
        self.broadcaster
            .send_to_group(RoleGroup::Buyers, group_event, payload)
            .await;
        tracing::info!(target: "notify", count = rows.len(), title, "buyer fan-out");
        Ok(rows)
    }

    /// 分页列表（新的在前），返回 (页, 总数)
    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> RepoResult<(Vec<Notification>, i64)> {
        notification_repo::list_for_user(&self.pool, user_id, limit, offset, unread_only).await
    }

    pub async fn unread_count(&self, user_id: &str) -> RepoResult<i64> {
        notification_repo::unread_count(&self.pool, user_id).await
    }

    /// 标记已读（幂等），成功后推送最新未读数
    pub async fn mark_read(&self, id: &str, user_id: &str) -> RepoResult<bool> {
        let found = notification_repo::mark_read(&self.pool, id, user_id).await?;
        if found {
            self.push_unread_count(user_id).await?;
        }
        Ok(found)
    }

    /// 全部标记已读（幂等），返回本次置为已读的行数
    pub async fn mark_all_read(&self, user_id: &str) -> RepoResult<u64> {
        let changed = notification_repo::mark_all_read(&self.pool, user_id).await?;
        self.push_unread_count(user_id).await?;
        Ok(changed)
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> RepoResult<bool> {
        notification_repo::delete(&self.pool, id, user_id).await
    }

    /// 删除过期通知，幂等，由定时任务调用
    pub async fn cleanup_expired(&self) -> RepoResult<u64> {
        let deleted =
            notification_repo::delete_expired(&self.pool, shared::util::now_millis()).await?;
        if deleted > 0 {
            tracing::info!(target: "notify", deleted, "expired notifications cleaned up");
        }
        Ok(deleted)
    }

    async fn push_row(&self, row: &Notification) {
        let payload = match serde_json::to_value(row) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "notify", error = %e, "failed to serialize notification");
                return;
            }
        };
        self.broadcaster
            .send_to_user(&row.user_id, event::NEW_NOTIFICATION, payload)
            .await;
    }

    async fn push_unread_count(&self, user_id: &str) -> RepoResult<()> {
        let count = self.unread_count(user_id).await?;
        self.broadcaster
            .send_to_user(
                user_id,
                event::UNREAD_COUNT_UPDATED,
                serde_json::json!({ "unreadCount": count }),
            )
            .await;
        Ok(())
    }
}
