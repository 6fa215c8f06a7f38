//! 订单状态机
//!
//! `PENDING_PAYMENT → PAID → DISPATCHED → DELIVERED`，
//! `PENDING_PAYMENT | PAID → CANCELLED`。
//!
//! 每个转换都是 `UPDATE ... WHERE id = ? AND status = ?` 守卫更新，
//! 并发冲突只有一个赢家，输家拿到 [`OrderError::InvalidTransition`]。
//! 库存副作用与状态更新同事务，要么全部生效要么全部回滚。
//! 通知在事务提交后发出，失败只记日志。

use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{OrderError, OrderResult, money, number};
use crate::db::models::{
    ApprovalStatus, Order, OrderStatus, OrderWithItems, PaymentStatus, ShippingAddress,
};
use crate::db::repository::{RepoError, order as order_repo, product as product_repo, user as user_repo};
use crate::notify::{NotificationService, triggers};
use crate::stock;
use shared::util::now_millis;

/// 预留窗口：下单后 24 小时
pub const RESERVATION_WINDOW_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// 低库存预警阈值（可售量）
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// 单行数量上限
pub const MAX_LINE_QUANTITY: i64 = 10_000;

pub const DEFAULT_PAYMENT_METHOD: &str = "OFFLINE_BANK_TRANSFER";
pub const DEFAULT_COURIER: &str = "Standard Courier";

/// sweeper 过期取消用的哨兵原因
pub const EXPIRY_REASON: &str = "Reservation expired";

/// 下单明细行
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct OrderLifecycle {
    pool: SqlitePool,
    notifications: NotificationService,
}

impl OrderLifecycle {
    pub fn new(pool: SqlitePool, notifications: NotificationService) -> Self {
        Self { pool, notifications }
    }

    // ========== 创建 ==========

    /// 创建订单：单事务内逐行预留库存并写入订单，任一行失败整体回滚。
    ///
    /// 订单号撞 UNIQUE 索引时换号重试一次。
    pub async fn create_order(
        &self,
        user_id: &str,
        items: &[CreateOrderItem],
        shipping_address: &str,
        payment_method: Option<&str>,
    ) -> OrderResult<OrderWithItems> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        for item in items {
            if item.quantity <= 0 || item.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::InvalidQuantity(format!(
                    "quantity {} for product {}",
                    item.quantity, item.product_id
                )));
            }
        }

        let buyer = user_repo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(OrderError::NotAuthorized)?;
        if buyer.status != ApprovalStatus::Approved {
            return Err(OrderError::NotAuthorized);
        }

        let address = ShippingAddress::normalize(shipping_address);
        let method = payment_method.unwrap_or(DEFAULT_PAYMENT_METHOD);

        let created = match self.try_create(user_id, items, &address, method).await {
            Err(OrderError::Database(msg)) if is_order_number_conflict(&msg) => {
                tracing::warn!(target: "orders", "order number collision, retrying once");
                self.try_create(user_id, items, &address, method).await?
            }
            other => other?,
        };

        if let Err(e) = triggers::order_placed(
            &self.notifications,
            &created.order,
            &buyer.business_name,
        )
        .await
        {
            tracing::warn!(target: "orders", error = %e, "order_placed notification failed");
        }

        tracing::info!(
            target: "orders",
            order_id = %created.order.id,
            order_number = %created.order.order_number,
            user_id,
            total_cents = created.order.total_cents,
            "order created"
        );
        Ok(created)
    }

    async fn try_create(
        &self,
        user_id: &str,
        items: &[CreateOrderItem],
        address: &ShippingAddress,
        payment_method: &str,
    ) -> OrderResult<OrderWithItems> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let snapshot = stock::reserve(&mut *tx, item.product_id.as_str(), item.quantity).await?;
            let line_total = money::line_total(snapshot.unit_price_cents, item.quantity)?;
            lines.push((item, snapshot, line_total));
        }
        let subtotal = money::checked_sum(lines.iter().map(|(_, _, t)| *t))?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: number::generate(now),
            user_id: user_id.to_string(),
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            payment_method: payment_method.to_string(),
            subtotal_cents: subtotal,
            total_cents: subtotal,
            shipping_address: address.to_canonical_json(),
            payment_proof_url: None,
            tracking_number: None,
            courier: None,
            notes: None,
            stock_reserved_until: Some(now + RESERVATION_WINDOW_MILLIS),
            payment_received_at: None,
            dispatched_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
        };

        order_repo::insert_order(&mut *tx, &order)
            .await
            .map_err(|e| match e {
                RepoError::Duplicate(msg) => OrderError::Database(format!("UNIQUE: {msg}")),
                other => other.into(),
            })?;
        for (item, snapshot, line_total) in &lines {
            order_repo::insert_item(
                &mut *tx,
                &order.id,
                &item.product_id,
                item.quantity,
                snapshot.unit_price_cents,
                *line_total,
            )
            .await?;
        }

        tx.commit().await?;

        order_repo::find_with_items(&self.pool, &order.id)
            .await?
            .ok_or_else(|| OrderError::Database("order vanished after create".into()))
    }

    // ========== 转换 ==========

    /// 付款确认：PENDING_PAYMENT -> PAID，同事务内逐行落账库存
    pub async fn mark_paid(&self, order_id: &str) -> OrderResult<OrderWithItems> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            "UPDATE orders SET status = ?, payment_status = ?, payment_received_at = ?, \
             stock_reserved_until = NULL \
             WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::Paid)
        .bind(PaymentStatus::Paid)
        .bind(now)
        .bind(order_id)
        .bind(OrderStatus::PendingPayment)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            tx.rollback().await?;
            return Err(self.transition_rejected(order_id, OrderStatus::Paid).await?);
        }

        let items = sqlx::query_as::<_, (String, i64)>(
            "SELECT product_id, quantity FROM order_items WHERE order_id = ?",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;
        for (product_id, quantity) in &items {
            stock::commit(&mut *tx, product_id, *quantity).await?;
        }

        tx.commit().await?;

        let order = self.require_order(order_id).await?;
        if let Err(e) = triggers::order_paid(&self.notifications, &order.order).await {
            tracing::warn!(target: "orders", error = %e, "order_paid notification failed");
        }
        self.check_low_stock(items.iter().map(|(id, _)| id.as_str())).await;

        tracing::info!(target: "orders", order_id, "order marked paid");
        Ok(order)
    }

    /// 发货：PAID -> DISPATCHED
    pub async fn dispatch(
        &self,
        order_id: &str,
        tracking_number: Option<&str>,
        courier: Option<&str>,
    ) -> OrderResult<OrderWithItems> {
        let rows = sqlx::query(
            "UPDATE orders SET status = ?, dispatched_at = ?, tracking_number = ?, courier = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::Dispatched)
        .bind(now_millis())
        .bind(tracking_number)
        .bind(courier.unwrap_or(DEFAULT_COURIER))
        .bind(order_id)
        .bind(OrderStatus::Paid)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(self
                .transition_rejected(order_id, OrderStatus::Dispatched)
                .await?);
        }

        let order = self.require_order(order_id).await?;
        if let Err(e) = triggers::order_dispatched(&self.notifications, &order.order).await {
            tracing::warn!(target: "orders", error = %e, "order_dispatched notification failed");
        }
        tracing::info!(target: "orders", order_id, "order dispatched");
        Ok(order)
    }

    /// 签收：DISPATCHED -> DELIVERED
    pub async fn mark_delivered(&self, order_id: &str) -> OrderResult<OrderWithItems> {
        let rows = sqlx::query(
            "UPDATE orders SET status = ?, delivered_at = ? WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::Delivered)
        .bind(now_millis())
        .bind(order_id)
        .bind(OrderStatus::Dispatched)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(self
                .transition_rejected(order_id, OrderStatus::Delivered)
                .await?);
        }

        let order = self.require_order(order_id).await?;
        if let Err(e) = triggers::order_delivered(&self.notifications, &order.order).await {
            tracing::warn!(target: "orders", error = %e, "order_delivered notification failed");
        }
        tracing::info!(target: "orders", order_id, "order delivered");
        Ok(order)
    }

    /// 取消：未付款解除预留，已付款回补库存，其余状态拒绝
    pub async fn cancel(&self, order_id: &str, reason: &str) -> OrderResult<OrderWithItems> {
        let current = order_repo::find_by_id(&self.pool, order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {order_id} not found")))?;

        match current.status {
            OrderStatus::PendingPayment | OrderStatus::Paid => {}
            other => {
                return Err(OrderError::InvalidTransition {
                    current: other,
                    attempted: OrderStatus::Cancelled,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        // 守卫绑定读到的状态：并发转换下输家 0 行命中
        let rows = sqlx::query(
            "UPDATE orders SET status = ?, cancelled_at = ?, notes = ?, \
             stock_reserved_until = NULL \
             WHERE id = ? AND status = ?",
        )
        .bind(OrderStatus::Cancelled)
        .bind(now_millis())
        .bind(reason)
        .bind(order_id)
        .bind(current.status)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            tx.rollback().await?;
            return Err(self
                .transition_rejected(order_id, OrderStatus::Cancelled)
                .await?);
        }

        let items = sqlx::query_as::<_, (String, i64)>(
            "SELECT product_id, quantity FROM order_items WHERE order_id = ?",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;
        for (product_id, quantity) in &items {
            match current.status {
                OrderStatus::PendingPayment => {
                    stock::release(&mut *tx, product_id, *quantity).await?
                }
                OrderStatus::Paid => stock::restore(&mut *tx, product_id, *quantity).await?,
                _ => unreachable!("guarded above"),
            }
        }

        tx.commit().await?;

        let order = self.require_order(order_id).await?;
        if let Err(e) = triggers::order_cancelled(&self.notifications, &order.order, reason).await {
            tracing::warn!(target: "orders", error = %e, "order_cancelled notification failed");
        }
        tracing::info!(target: "orders", order_id, reason, "order cancelled");
        Ok(order)
    }

    // ========== 其他操作 ==========

    /// 买家上传付款凭证：只存引用，状态不变
    pub async fn upload_payment_proof(
        &self,
        order_id: &str,
        requester_id: &str,
        proof_url: &str,
    ) -> OrderResult<OrderWithItems> {
        let order = order_repo::find_by_id(&self.pool, order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {order_id} not found")))?;
        if order.user_id != requester_id {
            return Err(OrderError::NotAuthorized);
        }

        sqlx::query("UPDATE orders SET payment_proof_url = ? WHERE id = ?")
            .bind(proof_url)
            .bind(order_id)
            .execute(&self.pool)
            .await?;

        let order = self.require_order(order_id).await?;
        if let Err(e) = triggers::payment_proof_uploaded(&self.notifications, &order.order).await {
            tracing::warn!(target: "orders", error = %e, "payment_proof notification failed");
        }
        tracing::info!(target: "orders", order_id, "payment proof uploaded");
        Ok(order)
    }

    /// 本人或管理员可见
    pub async fn get_order(
        &self,
        order_id: &str,
        requester_id: &str,
        is_admin: bool,
    ) -> OrderResult<OrderWithItems> {
        let order = self.require_order(order_id).await?;
        if !is_admin && order.order.user_id != requester_id {
            return Err(OrderError::NotAuthorized);
        }
        Ok(order)
    }

    pub async fn list_user_orders(&self, user_id: &str) -> OrderResult<Vec<OrderWithItems>> {
        Ok(order_repo::list_by_user(&self.pool, user_id).await?)
    }

    pub async fn list_all_orders(&self) -> OrderResult<Vec<OrderWithItems>> {
        Ok(order_repo::list_all(&self.pool).await?)
    }

    // ========== 内部 ==========

    async fn require_order(&self, order_id: &str) -> OrderResult<OrderWithItems> {
        order_repo::find_with_items(&self.pool, order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {order_id} not found")))
    }

    /// 守卫更新 0 行命中后的归因：缺失 -> NotFound，否则带当前状态的 InvalidTransition
    async fn transition_rejected(
        &self,
        order_id: &str,
        attempted: OrderStatus,
    ) -> Result<OrderError, OrderError> {
        let current = order_repo::find_by_id(&self.pool, order_id).await?;
        Ok(match current {
            None => OrderError::NotFound(format!("Order {order_id} not found")),
            Some(order) => OrderError::InvalidTransition {
                current: order.status,
                attempted,
            },
        })
    }

    /// 付款落账后触达低库存阈值的商品，给管理员发预警
    async fn check_low_stock(&self, product_ids: impl Iterator<Item = &str>) {
        for product_id in product_ids {
            let product = match product_repo::find_by_id(&self.pool, product_id).await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(target: "orders", error = %e, "low stock check failed");
                    continue;
                }
            };
            if product.available_stock() < LOW_STOCK_THRESHOLD {
                if let Err(e) = triggers::low_stock(
                    &self.notifications,
                    &product.id,
                    &product.name,
                    product.available_stock(),
                )
                .await
                {
                    tracing::warn!(target: "orders", error = %e, "low stock alert failed");
                }
            }
        }
    }
}

fn is_order_number_conflict(msg: &str) -> bool {
    msg.contains("UNIQUE") && msg.contains("order_number")
}
