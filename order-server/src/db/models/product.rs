//! Product Model
//!
//! stock / reserved_stock 只能通过 `crate::stock` 的账本操作修改，
//! 不变式: `0 <= reserved_stock <= stock`。

use serde::{Deserialize, Serialize};

/// Product row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    /// 实际库存（总量）
    pub stock: i64,
    /// 未付款订单占用的库存
    pub reserved_stock: i64,
    pub is_active: bool,
    pub featured: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// 可售库存 = stock - reserved_stock
    pub fn available_stock(&self) -> i64 {
        self.stock - self.reserved_stock
    }
}

/// Create product payload（目录管理属外部协作方，仅用于初始化/测试）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub stock: i64,
    #[serde(default)]
    pub featured: bool,
}
