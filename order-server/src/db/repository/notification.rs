//! Notification Repository

use super::RepoResult;
use crate::db::models::{NewNotification, Notification};
use shared::util::now_millis;
use sqlx::SqlitePool;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, type, title, message, data, priority, \
                       is_read, read_at, created_at, expires_at";

/// 插入一条通知，`expires_at = created_at + retention`
pub async fn insert(
    pool: &SqlitePool,
    input: &NewNotification,
    retention_millis: i64,
) -> RepoResult<Notification> {
    let id = Uuid::new_v4().to_string();
    let now = now_millis();
    let data = input
        .data
        .as_ref()
        .map(|v| v.to_string());

    sqlx::query(
        "INSERT INTO notifications (id, user_id, type, title, message, data, priority, \
         is_read, read_at, created_at, expires_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)",
    )
    .bind(&id)
    .bind(&input.user_id)
    .bind(input.notification_type)
    .bind(&input.title)
    .bind(&input.message)
    .bind(&data)
    .bind(input.priority)
    .bind(now)
    .bind(now + retention_millis)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| super::RepoError::Database("Failed to create notification".into()))
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Notification>> {
    let row = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// 分页列表，新的在前
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
    offset: i64,
    unread_only: bool,
) -> RepoResult<(Vec<Notification>, i64)> {
    let filter = if unread_only { "AND is_read = 0" } else { "" };

    let rows = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS} FROM notifications WHERE user_id = ? {filter} \
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? {filter}"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn unread_count(pool: &SqlitePool, user_id: &str) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// 标记单条已读。已读的行不再更新（幂等），返回是否匹配到本人的行
pub async fn mark_read(pool: &SqlitePool, id: &str, user_id: &str) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE notifications SET is_read = 1, read_at = ? \
         WHERE id = ? AND user_id = ? AND is_read = 0",
    )
    .bind(now_millis())
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();
    if rows > 0 {
        return Ok(true);
    }
    // 已读重标也算成功，只有不存在/不属于本人才算未命中
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE id = ? AND user_id = ?",
    )
    .bind(id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists > 0)
}

/// 全部标记已读，返回受影响行数。重复调用是 no-op
pub async fn mark_all_read(pool: &SqlitePool, user_id: &str) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE notifications SET is_read = 1, read_at = ? \
         WHERE user_id = ? AND is_read = 0",
    )
    .bind(now_millis())
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows)
}

pub async fn delete(pool: &SqlitePool, id: &str, user_id: &str) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

/// 删除所有已过期的通知，返回删除行数
pub async fn delete_expired(pool: &SqlitePool, now_millis: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM notifications WHERE expires_at < ?")
        .bind(now_millis)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows)
}
