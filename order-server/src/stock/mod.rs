//! Stock Ledger
//!
//! products.stock / reserved_stock 的唯一修改入口。四个操作都是单条
//! 带守卫的 UPDATE，在调用方的事务/连接上执行，绝不读出再写回。
//! 并发下两个事务竞争同一批库存时，后提交者的守卫重新求值，
//! 不满足则 0 行命中，转成类型化失败。
//!
//! 不变式: `0 <= reserved_stock <= stock`，由守卫 + CHECK 约束双重保证。

use crate::orders::{OrderError, OrderResult};
use sqlx::SqliteConnection;

/// reserve 成功后返回的商品快照，供订单行做价格快照
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSnapshot {
    pub name: String,
    pub unit_price_cents: i64,
}

/// 预留库存: `reserved_stock += qty`，守卫 `available >= qty` 且商品在售
///
/// 0 行命中时做一次补充读区分失败原因：
/// 商品缺失/下架 -> [`OrderError::ProductUnavailable`]，
/// 否则 -> [`OrderError::InsufficientStock`]。
pub async fn reserve(
    conn: &mut SqliteConnection,
    product_id: &str,
    qty: i64,
) -> OrderResult<ProductSnapshot> {
    let rows = sqlx::query(
        "UPDATE products SET reserved_stock = reserved_stock + ?, updated_at = ? \
         WHERE id = ? AND is_active = 1 AND stock - reserved_stock >= ?",
    )
    .bind(qty)
    .bind(shared::util::now_millis())
    .bind(product_id)
    .bind(qty)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(classify_reserve_failure(conn, product_id).await?);
    }

    let snapshot = sqlx::query_as::<_, ProductSnapshot>(
        "SELECT name, unit_price_cents FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(snapshot)
}

async fn classify_reserve_failure(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> Result<OrderError, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, i64, i64, bool)>(
        "SELECT name, stock, reserved_stock, is_active FROM products WHERE id = ?",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(match row {
        None => OrderError::ProductUnavailable(format!("Product {product_id} not found")),
        Some((name, _, _, false)) => {
            OrderError::ProductUnavailable(format!("Product {name} is no longer available"))
        }
        Some((name, stock, reserved, true)) => OrderError::InsufficientStock {
            name,
            available: stock - reserved,
        },
    })
}

/// 落账: `stock -= qty, reserved_stock -= qty`（付款确认时调用）
///
/// 守卫两个字段都足额。0 行命中说明账本已经不一致，
/// 按不变式破坏上报，绝不 clamp。
pub async fn commit(
    conn: &mut SqliteConnection,
    product_id: &str,
    qty: i64,
) -> OrderResult<()> {
    let rows = sqlx::query(
        "UPDATE products SET stock = stock - ?, reserved_stock = reserved_stock - ? \
         WHERE id = ? AND stock >= ? AND reserved_stock >= ?",
    )
    .bind(qty)
    .bind(qty)
    .bind(product_id)
    .bind(qty)
    .bind(qty)
    .execute(conn)
    .await?
    .rows_affected();

    if rows == 0 {
        let msg = format!("stock commit failed for product {product_id}, qty {qty}");
        tracing::error!(target: "stock", product_id, qty, "ledger invariant violated on commit");
        return Err(OrderError::InvariantViolation(msg));
    }
    Ok(())
}

/// 解除预留: `reserved_stock -= qty`（未付款取消 / 预留过期）
pub async fn release(
    conn: &mut SqliteConnection,
    product_id: &str,
    qty: i64,
) -> OrderResult<()> {
    let rows = sqlx::query(
        "UPDATE products SET reserved_stock = reserved_stock - ? \
         WHERE id = ? AND reserved_stock >= ?",
    )
    .bind(qty)
    .bind(product_id)
    .bind(qty)
    .execute(conn)
    .await?
    .rows_affected();

    if rows == 0 {
        let msg = format!("stock release failed for product {product_id}, qty {qty}");
        tracing::error!(target: "stock", product_id, qty, "ledger invariant violated on release");
        return Err(OrderError::InvariantViolation(msg));
    }
    Ok(())
}

/// 回补: `stock += qty`（已付款订单取消，货品回到可售池）
///
/// 不碰 reserved_stock：该订单自己的预留早在付款落账时被 commit
/// 消耗掉了，此刻账上的预留全部属于其他未付款订单。
pub async fn restore(
    conn: &mut SqliteConnection,
    product_id: &str,
    qty: i64,
) -> OrderResult<()> {
    let rows = sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
        .bind(qty)
        .bind(product_id)
        .execute(conn)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(OrderError::ProductUnavailable(format!(
            "Product {product_id} not found"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::models::ProductCreate;
    use crate::db::repository::product as product_repo;

    async fn setup(stock: i64) -> (DbService, String) {
        let db = DbService::in_memory().await;
        let product = product_repo::create(
            &db.pool,
            ProductCreate {
                sku: "SKU-1".into(),
                name: "Basmati Rice 25kg".into(),
                unit_price_cents: 245_000,
                stock,
                featured: false,
            },
        )
        .await
        .unwrap();
        (db, product.id)
    }

    async fn read_stock(db: &DbService, id: &str) -> (i64, i64) {
        let p = product_repo::find_by_id(&db.pool, id).await.unwrap().unwrap();
        (p.stock, p.reserved_stock)
    }

    #[tokio::test]
    async fn reserve_holds_stock_and_returns_snapshot() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        let snap = reserve(&mut *conn, &id, 4).await.unwrap();
        assert_eq!(snap.name, "Basmati Rice 25kg");
        assert_eq!(snap.unit_price_cents, 245_000);
        drop(conn);

        assert_eq!(read_stock(&db, &id).await, (10, 4));
    }

    #[tokio::test]
    async fn reserve_rejects_over_available() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        reserve(&mut *conn, &id, 7).await.unwrap();
        let err = reserve(&mut *conn, &id, 4).await.unwrap_err();
        match err {
            OrderError::InsufficientStock { name, available } => {
                assert_eq!(name, "Basmati Rice 25kg");
                assert_eq!(available, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
        drop(conn);

        // 失败的 reserve 不留痕迹
        assert_eq!(read_stock(&db, &id).await, (10, 7));
    }

    #[tokio::test]
    async fn reserve_missing_product_is_unavailable() {
        let (db, _) = setup(5).await;
        let mut conn = db.pool.acquire().await.unwrap();
        let err = reserve(&mut *conn, "no-such-id", 1).await.unwrap_err();
        assert!(matches!(err, OrderError::ProductUnavailable(_)));
    }

    #[tokio::test]
    async fn commit_consumes_both_fields() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        reserve(&mut *conn, &id, 4).await.unwrap();
        commit(&mut *conn, &id, 4).await.unwrap();
        drop(conn);

        assert_eq!(read_stock(&db, &id).await, (6, 0));
    }

    #[tokio::test]
    async fn commit_without_reservation_is_invariant_violation() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        let err = commit(&mut *conn, &id, 4).await.unwrap_err();
        assert!(matches!(err, OrderError::InvariantViolation(_)));
        drop(conn);

        assert_eq!(read_stock(&db, &id).await, (10, 0));
    }

    #[tokio::test]
    async fn release_returns_reservation_to_pool() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        reserve(&mut *conn, &id, 4).await.unwrap();
        release(&mut *conn, &id, 4).await.unwrap();
        drop(conn);

        assert_eq!(read_stock(&db, &id).await, (10, 0));
    }

    #[tokio::test]
    async fn restore_after_commit_refills_stock() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        reserve(&mut *conn, &id, 4).await.unwrap();
        commit(&mut *conn, &id, 4).await.unwrap();
        restore(&mut *conn, &id, 4).await.unwrap();
        drop(conn);

        // 预留已被 commit 消耗，restore 只回补 stock
        assert_eq!(read_stock(&db, &id).await, (10, 0));
    }

    #[tokio::test]
    async fn restore_leaves_other_reservations_intact() {
        let (db, id) = setup(10).await;
        let mut conn = db.pool.acquire().await.unwrap();

        // 两个订单各自预留，第一单走完 commit + restore
        reserve(&mut *conn, &id, 3).await.unwrap();
        reserve(&mut *conn, &id, 2).await.unwrap();
        commit(&mut *conn, &id, 3).await.unwrap();
        restore(&mut *conn, &id, 3).await.unwrap();
        drop(conn);

        // 第二单的预留原封不动
        assert_eq!(read_stock(&db, &id).await, (10, 2));

        // 之后第二单的 commit 仍然成立
        let mut conn = db.pool.acquire().await.unwrap();
        commit(&mut *conn, &id, 2).await.unwrap();
        drop(conn);
        assert_eq!(read_stock(&db, &id).await, (8, 0));
    }
}
