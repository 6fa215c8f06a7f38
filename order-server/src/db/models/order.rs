//! Order Model
//!
//! 订单主表 + 明细行。金额为整数分，创建后不再重算；
//! 每个状态只对应一个转换时间戳。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status enum
///
/// `PENDING_PAYMENT → PAID → DISPATCHED → DELIVERED`；
/// `PENDING_PAYMENT | PAID → CANCELLED`。终态不可再转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// 终态判定
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Payment status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// 收货地址 - 入库前统一规范化成结构化形态
///
/// 历史系统同一字段里混存纯文本和 JSON 两种形态；
/// 这里在边界收敛成单一 JSON 形态，纯文本落到 `line1`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ShippingAddress {
    /// 从任意输入规范化：合法 JSON 按结构解析，其余整体作为 line1
    pub fn normalize(raw: &str) -> Self {
        if let Ok(addr) = serde_json::from_str::<ShippingAddress>(raw) {
            return addr;
        }
        Self {
            line1: raw.trim().to_string(),
            line2: None,
            city: None,
            postal_code: None,
            country: None,
        }
    }

    /// 序列化成入库的规范 JSON
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"line1\":{:?}}}", self.line1))
    }
}

/// Order row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    /// canonical JSON (见 [`ShippingAddress`])
    pub shipping_address: String,
    pub payment_proof_url: Option<String>,
    pub tracking_number: Option<String>,
    pub courier: Option<String>,
    /// 取消原因
    pub notes: Option<String>,
    pub stock_reserved_until: Option<i64>,
    pub payment_received_at: Option<i64>,
    pub dispatched_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub created_at: i64,
}

/// Order item row — 下单时刻的单价快照
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// 订单 + 明细（API 返回形态）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_plain_text_address() {
        let addr = ShippingAddress::normalize("  12 Harbour Road, Mumbai  ");
        assert_eq!(addr.line1, "12 Harbour Road, Mumbai");
        assert!(addr.city.is_none());
    }

    #[test]
    fn normalize_json_address() {
        let addr = ShippingAddress::normalize(r#"{"line1":"Unit 4","city":"Pune"}"#);
        assert_eq!(addr.line1, "Unit 4");
        assert_eq!(addr.city.as_deref(), Some("Pune"));
    }

    #[test]
    fn canonical_json_is_single_shape() {
        let a = ShippingAddress::normalize("plain text");
        let b = ShippingAddress::normalize(&a.to_canonical_json());
        assert_eq!(a, b);
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::PendingPayment.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Dispatched.is_terminal());
    }
}
