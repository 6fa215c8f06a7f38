//! 订单号生成
//!
//! 格式: `ORD-<毫秒时间戳后8位>-<3位随机数>`。
//! 时间戳 + 随机后缀降低碰撞概率，最终由 UNIQUE 索引兜底，
//! 撞号时调用方重试一次。

use rand::Rng;

pub fn generate(now_millis: i64) -> String {
    let ts = format!("{now_millis:08}");
    let tail = &ts[ts.len() - 8..];
    let suffix: u32 = rand::thread_rng().gen_range(100..1000);
    format!("ORD-{tail}-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_ord_8_digits_dash_3_digits() {
        let n = generate(1_756_180_000_123);
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 3);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn time_part_is_last_8_digits() {
        let n = generate(1_756_180_000_123);
        assert!(n.starts_with("ORD-80000123-"));
    }
}
