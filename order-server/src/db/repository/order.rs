//! Order Repository
//!
//! 读取和插入。状态转换是业务守卫（guarded UPDATE），在 `orders::lifecycle` 中。
//! 插入类函数接收 `&mut SqliteConnection`，由调用方决定事务边界。

use super::RepoResult;
use crate::db::models::{Order, OrderItem, OrderWithItems};
use sqlx::{SqliteConnection, SqlitePool};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     subtotal_cents, total_cents, shipping_address, payment_proof_url, tracking_number, courier, \
     notes, stock_reserved_until, payment_received_at, dispatched_at, delivered_at, cancelled_at, \
     created_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price_cents, line_total_cents";

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Order>> {
    let order =
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(order)
}

pub async fn find_items(pool: &SqlitePool, order_id: &str) -> RepoResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

pub async fn find_with_items(pool: &SqlitePool, id: &str) -> RepoResult<Option<OrderWithItems>> {
    let Some(order) = find_by_id(pool, id).await? else {
        return Ok(None);
    };
    let items = find_items(pool, id).await?;
    Ok(Some(OrderWithItems { order, items }))
}

/// 买家自己的订单，新的在前
pub async fn list_by_user(pool: &SqlitePool, user_id: &str) -> RepoResult<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    attach_items(pool, orders).await
}

/// 管理端全量列表，新的在前
pub async fn list_all(pool: &SqlitePool) -> RepoResult<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    attach_items(pool, orders).await
}

async fn attach_items(
    pool: &SqlitePool,
    orders: Vec<Order>,
) -> RepoResult<Vec<OrderWithItems>> {
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let items = find_items(pool, &order.id).await?;
        result.push(OrderWithItems { order, items });
    }
    Ok(result)
}

/// 预留已到期的待支付订单 id（sweeper 扫描用）
pub async fn find_expired_pending_ids(
    pool: &SqlitePool,
    now_millis: i64,
) -> RepoResult<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM orders \
         WHERE status = 'PENDING_PAYMENT' AND stock_reserved_until IS NOT NULL \
           AND stock_reserved_until < ?",
    )
    .bind(now_millis)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, status, payment_status, payment_method, \
         subtotal_cents, total_cents, shipping_address, payment_proof_url, tracking_number, \
         courier, notes, stock_reserved_until, payment_received_at, dispatched_at, delivered_at, \
         cancelled_at, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(&order.payment_method)
    .bind(order.subtotal_cents)
    .bind(order.total_cents)
    .bind(&order.shipping_address)
    .bind(&order.payment_proof_url)
    .bind(&order.tracking_number)
    .bind(&order.courier)
    .bind(&order.notes)
    .bind(order.stock_reserved_until)
    .bind(order.payment_received_at)
    .bind(order.dispatched_at)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .bind(order.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: &str,
    product_id: &str,
    quantity: i64,
    unit_price_cents: i64,
    line_total_cents: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, \
         line_total_cents) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price_cents)
    .bind(line_total_cents)
    .execute(conn)
    .await?;
    Ok(())
}
