//! User Repository
//!
//! 认证协作方目录的本地镜像，供 fan-out 和审批门槛读取。

use super::RepoResult;
use crate::db::models::{ApprovalStatus, Role, User};
use shared::util::now_millis;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, email, business_name, role, status, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<User>> {
    let user =
        sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

/// 全部管理员（fan-out 用，无上限）
pub async fn find_admins(pool: &SqlitePool) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE role = ? ORDER BY created_at"
    ))
    .bind(Role::Admin)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// 已审核买家，限量（广播型通知的 fan-out 上限）
pub async fn find_approved_buyers(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE role = ? AND status = ? ORDER BY created_at LIMIT ?"
    ))
    .bind(Role::Buyer)
    .bind(ApprovalStatus::Approved)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(users)
}

/// 镜像 upsert：认证协作方推送用户目录变更时调用
pub async fn upsert(
    pool: &SqlitePool,
    id: &str,
    email: &str,
    business_name: &str,
    role: Role,
    status: ApprovalStatus,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO users (id, email, business_name, role, status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
           email = excluded.email, \
           business_name = excluded.business_name, \
           role = excluded.role, \
           status = excluded.status",
    )
    .bind(id)
    .bind(email)
    .bind(business_name)
    .bind(role)
    .bind(status)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(())
}
