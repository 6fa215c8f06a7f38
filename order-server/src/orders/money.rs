//! 金额辅助
//!
//! 存储和运算一律整数分，Decimal 只出现在格式化/解析边界。

use super::{OrderError, OrderResult};
use rust_decimal::Decimal;

/// 单行金额: `unit_price * qty`，溢出按数量非法处理
pub fn line_total(unit_price_cents: i64, quantity: i64) -> OrderResult<i64> {
    unit_price_cents
        .checked_mul(quantity)
        .ok_or_else(|| OrderError::InvalidQuantity(format!("quantity {quantity} overflows")))
}

/// 累加金额
pub fn checked_sum(values: impl IntoIterator<Item = i64>) -> OrderResult<i64> {
    let mut total: i64 = 0;
    for v in values {
        total = total
            .checked_add(v)
            .ok_or_else(|| OrderError::InvalidQuantity("order total overflows".into()))?;
    }
    Ok(total)
}

/// 分转两位小数的金额字符串（通知文案用）
pub fn format_amount(cents: i64) -> String {
    let d = Decimal::new(cents, 2);
    format!("{d:.2}")
}
