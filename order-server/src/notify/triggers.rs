//! 业务通知触发器
//!
//! 文案模板集中在这里，调用方只传业务数据。
//! 金额显示为卢比两位小数（`orders::money::format_amount`）。

use serde_json::json;
use shared::message::event;

use super::NotificationService;
use crate::db::models::{NewNotification, NotificationType, Order, Priority};
use crate::db::repository::RepoResult;
use crate::orders::money::format_amount;

/// 新订单 -> 管理员 (HIGH)
pub async fn order_placed(
    svc: &NotificationService,
    order: &Order,
    buyer_business_name: &str,
) -> RepoResult<()> {
    let data = json!({
        "orderId": order.id,
        "orderNumber": order.order_number,
        "totalAmount": format_amount(order.total_cents),
    });
    svc.create_for_admins(
        NotificationType::OrderStatusChange,
        "New Order Received 📦",
        &format!(
            "Order {} placed by {} for ₹{}",
            order.order_number,
            buyer_business_name,
            format_amount(order.total_cents)
        ),
        Some(data),
        Priority::High,
        event::NEW_ORDER,
    )
    .await?;
    Ok(())
}

/// 付款凭证上传 -> 管理员 (HIGH)
pub async fn payment_proof_uploaded(svc: &NotificationService, order: &Order) -> RepoResult<()> {
    let data = json!({
        "orderId": order.id,
        "orderNumber": order.order_number,
    });
    svc.create_for_admins(
        NotificationType::PaymentConfirmation,
        "Payment Proof Uploaded 🧾",
        &format!(
            "Payment proof uploaded for order {}. Please verify.",
            order.order_number
        ),
        Some(data),
        Priority::High,
        event::PAYMENT_PROOF_UPLOADED,
    )
    .await?;
    Ok(())
}

/// 付款确认 -> 买家 (HIGH)
pub async fn order_paid(svc: &NotificationService, order: &Order) -> RepoResult<()> {
    svc.create(
        NewNotification::new(
            &order.user_id,
            NotificationType::PaymentConfirmation,
            "Payment Confirmed ✅",
            format!(
                "Payment of ₹{} for order {} has been confirmed. Your order is being prepared.",
                format_amount(order.total_cents),
                order.order_number
            ),
        )
        .with_priority(Priority::High)
        .with_data(json!({ "orderId": order.id, "orderNumber": order.order_number })),
    )
    .await?;
    Ok(())
}

/// 发货 -> 买家 (HIGH)，带运单信息
pub async fn order_dispatched(svc: &NotificationService, order: &Order) -> RepoResult<()> {
    let tracking = match (&order.tracking_number, &order.courier) {
        (Some(num), Some(courier)) => format!(" Tracking: {num} via {courier}."),
        (Some(num), None) => format!(" Tracking: {num}."),
        _ => String::new(),
    };
    svc.create(
        NewNotification::new(
            &order.user_id,
            NotificationType::OrderStatusChange,
            "Order Dispatched 🚚",
            format!("Order {} has been dispatched.{tracking}", order.order_number),
        )
        .with_priority(Priority::High)
        .with_data(json!({
            "orderId": order.id,
            "orderNumber": order.order_number,
            "trackingNumber": order.tracking_number,
            "courier": order.courier,
        })),
    )
    .await?;
    Ok(())
}

/// 签收 -> 买家 (MEDIUM)
pub async fn order_delivered(svc: &NotificationService, order: &Order) -> RepoResult<()> {
    svc.create(
        NewNotification::new(
            &order.user_id,
            NotificationType::OrderStatusChange,
            "Order Delivered 🎉",
            format!(
                "Order {} has been delivered. Thank you for your business!",
                order.order_number
            ),
        )
        .with_priority(Priority::Medium)
        .with_data(json!({ "orderId": order.id, "orderNumber": order.order_number })),
    )
    .await?;
    Ok(())
}

/// 取消 -> 买家 (URGENT)，附原因
pub async fn order_cancelled(
    svc: &NotificationService,
    order: &Order,
    reason: &str,
) -> RepoResult<()> {
    svc.create(
        NewNotification::new(
            &order.user_id,
            NotificationType::OrderStatusChange,
            "Order Cancelled ❌",
            format!("Order {} has been cancelled. Reason: {reason}", order.order_number),
        )
        .with_priority(Priority::Urgent)
        .with_data(json!({
            "orderId": order.id,
            "orderNumber": order.order_number,
            "reason": reason,
        })),
    )
    .await?;
    Ok(())
}

/// 新用户注册 -> 管理员 (MEDIUM)
pub async fn user_registered(
    svc: &NotificationService,
    user_id: &str,
    business_name: &str,
    email: &str,
) -> RepoResult<()> {
    svc.create_for_admins(
        NotificationType::SystemAnnouncement,
        "New User Registration 👤",
        &format!("{business_name} ({email}) has registered and is awaiting approval."),
        Some(json!({ "userId": user_id })),
        Priority::Medium,
        event::NEW_USER_REGISTRATION,
    )
    .await?;
    Ok(())
}

/// 账户审批通过 -> 用户 (URGENT)
pub async fn account_approved(svc: &NotificationService, user_id: &str) -> RepoResult<()> {
    svc.create(
        NewNotification::new(
            user_id,
            NotificationType::AccountApproved,
            "Account Approved 🎉",
            "Your account has been approved. You can now place orders.",
        )
        .with_priority(Priority::Urgent),
    )
    .await?;
    Ok(())
}

/// 账户审批拒绝 -> 用户 (URGENT)
pub async fn account_rejected(
    svc: &NotificationService,
    user_id: &str,
    reason: &str,
) -> RepoResult<()> {
    svc.create(
        NewNotification::new(
            user_id,
            NotificationType::AccountRejected,
            "Account Application Rejected",
            format!("Your account application was rejected. Reason: {reason}"),
        )
        .with_priority(Priority::Urgent),
    )
    .await?;
    Ok(())
}

/// 低库存预警 -> 管理员 (MEDIUM)
pub async fn low_stock(
    svc: &NotificationService,
    product_id: &str,
    product_name: &str,
    available: i64,
) -> RepoResult<()> {
    svc.create_for_admins(
        NotificationType::LowStockAlert,
        "Low Stock Alert ⚠️",
        &format!("{product_name} is running low: {available} units available."),
        Some(json!({ "productId": product_id, "available": available })),
        Priority::Medium,
        event::NEW_NOTIFICATION,
    )
    .await?;
    Ok(())
}

/// 新上架精选商品 -> 已审核买家 (LOW)
pub async fn featured_product_added(
    svc: &NotificationService,
    product_id: &str,
    product_name: &str,
) -> RepoResult<()> {
    svc.create_for_approved_buyers(
        NotificationType::NewProduct,
        "New Product Added ✨",
        &format!("{product_name} is now available for ordering."),
        Some(json!({ "productId": product_id })),
        Priority::Low,
        event::NEW_PRODUCT_ADDED,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::models::{ApprovalStatus, Role};
    use crate::db::repository::{notification as notification_repo, user as user_repo};
    use crate::notify::broadcaster::testing::{Push, RecordingBroadcaster};
    use shared::message::RoleGroup;
    use std::sync::Arc;

    async fn setup() -> (DbService, NotificationService, Arc<RecordingBroadcaster>) {
        let db = DbService::in_memory().await;
        for (id, role, status) in [
            ("admin-1", Role::Admin, ApprovalStatus::Approved),
            ("buyer-1", Role::Buyer, ApprovalStatus::Approved),
        ] {
            user_repo::upsert(&db.pool, id, &format!("{id}@co.in"), id, role, status)
                .await
                .unwrap();
        }
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let svc = NotificationService::new(db.pool.clone(), broadcaster.clone());
        (db, svc, broadcaster)
    }

    #[tokio::test]
    async fn registration_and_review_notify_the_right_parties() {
        let (db, svc, _) = setup().await;

        user_registered(&svc, "buyer-9", "Sharma Traders", "sharma@co.in")
            .await
            .unwrap();
        assert_eq!(
            notification_repo::unread_count(&db.pool, "admin-1").await.unwrap(),
            1
        );

        account_approved(&svc, "buyer-1").await.unwrap();
        account_rejected(&svc, "buyer-1", "Incomplete documents")
            .await
            .unwrap();
        let (rows, total) = notification_repo::list_for_user(&db.pool, "buyer-1", 10, 0, false)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.priority == Priority::Urgent));
    }

    #[tokio::test]
    async fn featured_product_fans_out_to_buyers_room() {
        let (db, svc, broadcaster) = setup().await;

        featured_product_added(&svc, "prod-1", "Basmati Rice 25kg")
            .await
            .unwrap();
        assert_eq!(
            notification_repo::unread_count(&db.pool, "buyer-1").await.unwrap(),
            1
        );
        // 管理员不在买家房间里
        assert_eq!(
            notification_repo::unread_count(&db.pool, "admin-1").await.unwrap(),
            0
        );
        assert!(broadcaster.pushes().iter().any(|p| matches!(
            p,
            Push::Group { group, event, .. }
                if *group == RoleGroup::Buyers && event == event::NEW_PRODUCT_ADDED
        )));
    }
}
