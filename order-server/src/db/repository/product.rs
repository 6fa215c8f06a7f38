//! Product Repository
//!
//! 只读查询 + 目录初始化。stock / reserved_stock 的修改走 `stock` 账本。

use super::RepoResult;
use crate::db::models::{Product, ProductCreate};
use shared::util::now_millis;
use sqlx::SqlitePool;
use uuid::Uuid;

const COLUMNS: &str = "id, sku, name, unit_price_cents, stock, reserved_stock, \
                       is_active, featured, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {COLUMNS} FROM products WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let id = Uuid::new_v4().to_string();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO products (id, sku, name, unit_price_cents, stock, reserved_stock, \
         is_active, featured, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, 1, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&data.sku)
    .bind(&data.name)
    .bind(data.unit_price_cents)
    .bind(data.stock)
    .bind(data.featured)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| super::RepoError::Database("Failed to create product".into()))
}
