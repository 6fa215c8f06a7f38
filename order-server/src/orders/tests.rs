//! 订单域集成测试
//!
//! 内存库 + 录制推送假件，覆盖状态机、库存账本闭环和通知 fan-out。

use std::sync::Arc;

use super::lifecycle::{
    CreateOrderItem, DEFAULT_COURIER, DEFAULT_PAYMENT_METHOD, EXPIRY_REASON, OrderLifecycle,
};
use super::sweeper::ReservationSweeper;
use super::OrderError;
use crate::db::DbService;
use crate::db::models::{ApprovalStatus, OrderStatus, PaymentStatus, ProductCreate, Role};
use crate::db::repository::{
    notification as notification_repo, product as product_repo, user as user_repo,
};
use crate::notify::NotificationService;
use crate::notify::broadcaster::testing::{Push, RecordingBroadcaster};
use shared::message::RoleGroup;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct TestEnv {
    db: DbService,
    lifecycle: OrderLifecycle,
    notifications: NotificationService,
    broadcaster: Arc<RecordingBroadcaster>,
}

async fn setup() -> TestEnv {
    let db = DbService::in_memory().await;
    for (id, email, name, role, status) in [
        ("admin-1", "a1@co.in", "HQ Ops", Role::Admin, ApprovalStatus::Approved),
        ("admin-2", "a2@co.in", "HQ Ops 2", Role::Admin, ApprovalStatus::Approved),
        ("buyer-1", "b1@co.in", "Sharma Traders", Role::Buyer, ApprovalStatus::Approved),
        ("buyer-2", "b2@co.in", "Pending Mart", Role::Buyer, ApprovalStatus::Pending),
    ] {
        user_repo::upsert(&db.pool, id, email, name, role, status)
            .await
            .unwrap();
    }

    let broadcaster = Arc::new(RecordingBroadcaster::new());
    let notifications = NotificationService::new(db.pool.clone(), broadcaster.clone());
    let lifecycle = OrderLifecycle::new(db.pool.clone(), notifications.clone());
    TestEnv {
        db,
        lifecycle,
        notifications,
        broadcaster,
    }
}

async fn seed_product(env: &TestEnv, sku: &str, price_cents: i64, stock: i64) -> String {
    product_repo::create(
        &env.db.pool,
        ProductCreate {
            sku: sku.into(),
            name: format!("Product {sku}"),
            unit_price_cents: price_cents,
            stock,
            featured: false,
        },
    )
    .await
    .unwrap()
    .id
}

async fn stock_of(env: &TestEnv, product_id: &str) -> (i64, i64) {
    let p = product_repo::find_by_id(&env.db.pool, product_id)
        .await
        .unwrap()
        .unwrap();
    (p.stock, p.reserved_stock)
}

fn line(product_id: &str, quantity: i64) -> CreateOrderItem {
    CreateOrderItem {
        product_id: product_id.into(),
        quantity,
    }
}

// ========== 创建 ==========

#[tokio::test]
async fn create_order_reserves_and_snapshots_prices() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 245_000, 50).await;
    let p2 = seed_product(&env, "OIL", 89_900, 20).await;

    let created = env
        .lifecycle
        .create_order(
            "buyer-1",
            &[line(&p1, 2), line(&p2, 3)],
            "12 Harbour Road, Mumbai",
            None,
        )
        .await
        .unwrap();

    assert_eq!(created.order.status, OrderStatus::PendingPayment);
    assert_eq!(created.order.payment_status, PaymentStatus::Pending);
    assert_eq!(created.order.payment_method, DEFAULT_PAYMENT_METHOD);
    assert_eq!(created.order.subtotal_cents, 2 * 245_000 + 3 * 89_900);
    assert_eq!(created.order.total_cents, created.order.subtotal_cents);
    assert!(created.order.order_number.starts_with("ORD-"));
    assert!(created.order.stock_reserved_until.unwrap() > created.order.created_at);
    assert_eq!(created.items.len(), 2);
    assert_eq!(created.items[0].unit_price_cents, 245_000);

    // 库存只预留，不消耗
    assert_eq!(stock_of(&env, &p1).await, (50, 2));
    assert_eq!(stock_of(&env, &p2).await, (20, 3));

    // 地址规范化成单一 JSON 形态
    assert!(created.order.shipping_address.contains("\"line1\""));
}

#[tokio::test]
async fn create_order_rejects_empty_and_bad_quantities() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 5).await;

    let err = env
        .lifecycle
        .create_order("buyer-1", &[], "addr", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::EmptyOrder));

    let err = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 0)], "addr", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidQuantity(_)));

    let err = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, -3)], "addr", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidQuantity(_)));
}

#[tokio::test]
async fn create_order_requires_approved_buyer() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 5).await;

    let err = env
        .lifecycle
        .create_order("buyer-2", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAuthorized));

    let err = env
        .lifecycle
        .create_order("ghost", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAuthorized));
}

#[tokio::test]
async fn create_order_rolls_back_all_lines_on_failure() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let p2 = seed_product(&env, "OIL", 1000, 2).await;

    let err = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 10), line(&p2, 5)], "addr", None)
        .await
        .unwrap_err();
    match err {
        OrderError::InsufficientStock { name, available } => {
            assert_eq!(name, "Product OIL");
            assert_eq!(available, 2);
        }
        other => panic!("unexpected: {other:?}"),
    }

    // 第一行的预留随事务一起回滚
    assert_eq!(stock_of(&env, &p1).await, (50, 0));
    assert_eq!(stock_of(&env, &p2).await, (2, 0));
}

#[tokio::test]
async fn create_order_fans_out_one_row_per_admin() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;

    env.lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();

    // 每个管理员一行，已读状态独立
    let a1 = notification_repo::unread_count(&env.db.pool, "admin-1").await.unwrap();
    let a2 = notification_repo::unread_count(&env.db.pool, "admin-2").await.unwrap();
    assert_eq!((a1, a2), (1, 1));

    env.notifications.mark_all_read("admin-1").await.unwrap();
    let a1 = notification_repo::unread_count(&env.db.pool, "admin-1").await.unwrap();
    let a2 = notification_repo::unread_count(&env.db.pool, "admin-2").await.unwrap();
    assert_eq!((a1, a2), (0, 1));

    // 组推送只发一次
    let group_pushes: Vec<_> = env
        .broadcaster
        .pushes()
        .into_iter()
        .filter(|p| matches!(p, Push::Group { group: RoleGroup::Admins, event, .. } if event == "new_order"))
        .collect();
    assert_eq!(group_pushes.len(), 1);
}

#[tokio::test]
async fn no_oversell_under_concurrent_orders() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 10).await;

    let lifecycle = Arc::new(env.lifecycle.clone());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let lc = lifecycle.clone();
        let pid = p1.clone();
        handles.push(tokio::spawn(async move {
            lc.create_order("buyer-1", &[line(&pid, 3)], "addr", None).await
        }));
    }

    let mut successes = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    // 10 件库存，每单 3 件：最多 3 单成功
    assert!(successes <= 3);
    let (stock, reserved) = stock_of(&env, &p1).await;
    assert_eq!(stock, 10);
    assert_eq!(reserved, successes * 3);
    assert!(reserved <= stock);
}

// ========== 转换 ==========

#[tokio::test]
async fn mark_paid_commits_stock_and_sets_fields() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 4)], "addr", None)
        .await
        .unwrap();

    let paid = env.lifecycle.mark_paid(&order.order.id).await.unwrap();
    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert_eq!(paid.order.payment_status, PaymentStatus::Paid);
    assert!(paid.order.payment_received_at.is_some());
    assert!(paid.order.stock_reserved_until.is_none());

    assert_eq!(stock_of(&env, &p1).await, (46, 0));

    // 买家收到付款确认
    let (rows, _) = notification_repo::list_for_user(&env.db.pool, "buyer-1", 10, 0, false)
        .await
        .unwrap();
    assert!(rows.iter().any(|n| n.title.starts_with("Payment Confirmed")));
}

#[tokio::test]
async fn mark_paid_triggers_low_stock_alert() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 12).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 4)], "addr", None)
        .await
        .unwrap();

    env.lifecycle.mark_paid(&order.order.id).await.unwrap();

    // 可售降到 8 (< 10)，管理员收到低库存预警
    let (rows, _) = notification_repo::list_for_user(&env.db.pool, "admin-1", 10, 0, false)
        .await
        .unwrap();
    assert!(rows.iter().any(|n| n.title.starts_with("Low Stock Alert")));
}

#[tokio::test]
async fn dispatch_guard_rejects_pending_and_accepts_paid() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();

    let err = env
        .lifecycle
        .dispatch(&order.order.id, Some("TRK-1"), None)
        .await
        .unwrap_err();
    match err {
        OrderError::InvalidTransition { current, attempted } => {
            assert_eq!(current, OrderStatus::PendingPayment);
            assert_eq!(attempted, OrderStatus::Dispatched);
        }
        other => panic!("unexpected: {other:?}"),
    }

    env.lifecycle.mark_paid(&order.order.id).await.unwrap();
    let dispatched = env
        .lifecycle
        .dispatch(&order.order.id, Some("TRK-1"), None)
        .await
        .unwrap();
    assert_eq!(dispatched.order.status, OrderStatus::Dispatched);
    assert_eq!(dispatched.order.tracking_number.as_deref(), Some("TRK-1"));
    assert_eq!(dispatched.order.courier.as_deref(), Some(DEFAULT_COURIER));
    assert!(dispatched.order.dispatched_at.is_some());
}

#[tokio::test]
async fn delivered_is_terminal() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();
    env.lifecycle.mark_paid(&order.order.id).await.unwrap();
    env.lifecycle
        .dispatch(&order.order.id, None, Some("BlueDart"))
        .await
        .unwrap();
    let delivered = env.lifecycle.mark_delivered(&order.order.id).await.unwrap();
    assert_eq!(delivered.order.status, OrderStatus::Delivered);

    let err = env
        .lifecycle
        .cancel(&order.order.id, "too late")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition { current: OrderStatus::Delivered, .. }
    ));
}

#[tokio::test]
async fn cancel_pending_releases_reservation() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 5)], "addr", None)
        .await
        .unwrap();
    assert_eq!(stock_of(&env, &p1).await, (50, 5));

    let cancelled = env
        .lifecycle
        .cancel(&order.order.id, "changed my mind")
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.order.notes.as_deref(), Some("changed my mind"));
    assert!(cancelled.order.cancelled_at.is_some());

    // 预留完整归还，可售恢复
    assert_eq!(stock_of(&env, &p1).await, (50, 0));
}

#[tokio::test]
async fn cancel_paid_restores_stock() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 5)], "addr", None)
        .await
        .unwrap();
    env.lifecycle.mark_paid(&order.order.id).await.unwrap();
    assert_eq!(stock_of(&env, &p1).await, (45, 0));

    env.lifecycle
        .cancel(&order.order.id, "quality issue")
        .await
        .unwrap();

    // 已消耗的库存回补到可售池
    assert_eq!(stock_of(&env, &p1).await, (50, 0));

    // 买家收到带原因的取消通知
    let (rows, _) = notification_repo::list_for_user(&env.db.pool, "buyer-1", 10, 0, false)
        .await
        .unwrap();
    assert!(rows.iter().any(|n| n.message.contains("quality issue")));
}

#[tokio::test]
async fn cancel_paid_keeps_other_orders_reservations() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 10).await;
    let order_a = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 3)], "addr", None)
        .await
        .unwrap();
    let order_b = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 2)], "addr", None)
        .await
        .unwrap();

    env.lifecycle.mark_paid(&order_a.order.id).await.unwrap();
    assert_eq!(stock_of(&env, &p1).await, (7, 2));

    // A 的回补不能吞掉 B 还活着的预留
    env.lifecycle
        .cancel(&order_a.order.id, "returned")
        .await
        .unwrap();
    assert_eq!(stock_of(&env, &p1).await, (10, 2));

    let paid_b = env.lifecycle.mark_paid(&order_b.order.id).await.unwrap();
    assert_eq!(paid_b.order.status, OrderStatus::Paid);
    assert_eq!(stock_of(&env, &p1).await, (8, 0));
}

// ========== 付款凭证 / 查询 ==========

#[tokio::test]
async fn payment_proof_requires_ownership() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();

    let err = env
        .lifecycle
        .upload_payment_proof(&order.order.id, "buyer-2", "upload/ref-1")
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAuthorized));

    let updated = env
        .lifecycle
        .upload_payment_proof(&order.order.id, "buyer-1", "upload/ref-1")
        .await
        .unwrap();
    assert_eq!(updated.order.payment_proof_url.as_deref(), Some("upload/ref-1"));
    assert_eq!(updated.order.status, OrderStatus::PendingPayment);

    // 管理员收到凭证上传通知
    let (rows, _) = notification_repo::list_for_user(&env.db.pool, "admin-1", 10, 0, false)
        .await
        .unwrap();
    assert!(rows.iter().any(|n| n.title.starts_with("Payment Proof Uploaded")));
}

#[tokio::test]
async fn get_order_is_owner_or_admin_only() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();

    assert!(env.lifecycle.get_order(&order.order.id, "buyer-1", false).await.is_ok());
    assert!(env.lifecycle.get_order(&order.order.id, "admin-1", true).await.is_ok());
    let err = env
        .lifecycle
        .get_order(&order.order.id, "buyer-2", false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotAuthorized));
}

#[tokio::test]
async fn list_user_orders_newest_first() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let first = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();
    let second = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 1)], "addr", None)
        .await
        .unwrap();

    let orders = env.lifecycle.list_user_orders("buyer-1").await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order.id, second.order.id);
    assert_eq!(orders[1].order.id, first.order.id);

    let all = env.lifecycle.list_all_orders().await.unwrap();
    assert_eq!(all.len(), 2);
}

// ========== 过期清扫 ==========

async fn force_expire(env: &TestEnv, order_id: &str) {
    sqlx::query("UPDATE orders SET stock_reserved_until = ? WHERE id = ?")
        .bind(shared::util::now_millis() - 1000)
        .bind(order_id)
        .execute(&env.db.pool)
        .await
        .unwrap();
}

fn sweeper(env: &TestEnv) -> ReservationSweeper {
    ReservationSweeper::new(
        env.db.pool.clone(),
        env.lifecycle.clone(),
        Duration::from_secs(300),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn sweep_cancels_expired_exactly_once() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 5)], "addr", None)
        .await
        .unwrap();
    force_expire(&env, &order.order.id).await;

    let sweeper = sweeper(&env);
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

    let swept = env
        .lifecycle
        .get_order(&order.order.id, "buyer-1", false)
        .await
        .unwrap();
    assert_eq!(swept.order.status, OrderStatus::Cancelled);
    assert_eq!(swept.order.notes.as_deref(), Some(EXPIRY_REASON));
    assert_eq!(stock_of(&env, &p1).await, (50, 0));

    // 重扫选不到任何行，绝无二次释放
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    assert_eq!(stock_of(&env, &p1).await, (50, 0));
}

#[tokio::test]
async fn sweep_skips_paid_orders() {
    let env = setup().await;
    let p1 = seed_product(&env, "RICE", 1000, 50).await;
    let order = env
        .lifecycle
        .create_order("buyer-1", &[line(&p1, 5)], "addr", None)
        .await
        .unwrap();
    force_expire(&env, &order.order.id).await;
    env.lifecycle.mark_paid(&order.order.id).await.unwrap();

    // 付款时已清掉 stock_reserved_until，清扫选不到
    assert_eq!(sweeper(&env).sweep_once().await.unwrap(), 0);
    let kept = env
        .lifecycle
        .get_order(&order.order.id, "buyer-1", false)
        .await
        .unwrap();
    assert_eq!(kept.order.status, OrderStatus::Paid);
}
