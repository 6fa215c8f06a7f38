//! 消息总线消息类型定义
//!
//! 这些类型在 order-server 和 clients 之间共享。服务端把每条
//! 推送封装成 [`BusMessage`] 广播，客户端按 [`Recipient`] 过滤，
//! 只处理发给自己（或自己所在角色房间）的消息。

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 事件名常量
///
/// 与持久化通知解耦：事件是实时提示，通知行才是事实来源。
pub mod event {
    /// 新通知已写入（payload 为通知行）
    pub const NEW_NOTIFICATION: &str = "new_notification";
    /// 未读数变化（payload: `{ "unreadCount": n }`）
    pub const UNREAD_COUNT_UPDATED: &str = "unread_count_updated";
    /// 新订单（发给 admins 房间）
    pub const NEW_ORDER: &str = "new_order";
    /// 买家上传付款凭证（发给 admins 房间）
    pub const PAYMENT_PROOF_UPLOADED: &str = "payment_proof_uploaded";
    /// 新用户注册（发给 admins 房间）
    pub const NEW_USER_REGISTRATION: &str = "new_user_registration";
    /// 新品上架（发给 buyers 房间）
    pub const NEW_PRODUCT_ADDED: &str = "new_product_added";
}

/// 角色房间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleGroup {
    /// 所有管理员
    Admins,
    /// 所有买家
    Buyers,
}

impl fmt::Display for RoleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleGroup::Admins => write!(f, "admins"),
            RoleGroup::Buyers => write!(f, "buyers"),
        }
    }
}

/// 消息收件方 - 单用户房间或角色房间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// 指定用户 (room = `user:{id}`)
    User(String),
    /// 角色房间
    Group(RoleGroup),
}

impl Recipient {
    /// 判断一个已连接会话是否应收到该消息
    ///
    /// `is_admin` 为假时会话归属 buyers 房间（与网关加入房间的
    /// 规则一致：非管理员即买家）。
    pub fn matches(&self, user_id: &str, is_admin: bool) -> bool {
        match self {
            Recipient::User(id) => id == user_id,
            Recipient::Group(RoleGroup::Admins) => is_admin,
            Recipient::Group(RoleGroup::Buyers) => !is_admin,
        }
    }
}

/// 总线消息 - 服务器推送给已连接会话的信封
///
/// 推送是尽力而为：没有在线会话时消息被丢弃，
/// 持久化的通知行才是事实来源。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    /// 消息 ID（用于追踪/去重）
    pub id: Uuid,
    /// 收件方
    pub recipient: Recipient,
    /// 事件名（见 [`event`] 常量）
    pub event: String,
    /// 业务负载
    pub payload: serde_json::Value,
    /// 发送时间 (Unix millis)
    pub sent_at: i64,
}

impl BusMessage {
    /// 创建发给单用户的消息
    pub fn to_user(user_id: impl Into<String>, event: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: Recipient::User(user_id.into()),
            event: event.to_string(),
            payload,
            sent_at: crate::util::now_millis(),
        }
    }

    /// 创建发给角色房间的消息
    pub fn to_group(group: RoleGroup, event: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: Recipient::Group(group),
            event: event.to_string(),
            payload,
            sent_at: crate::util::now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_matching_rooms() {
        let to_user = Recipient::User("u1".into());
        assert!(to_user.matches("u1", false));
        assert!(!to_user.matches("u2", false));

        let to_admins = Recipient::Group(RoleGroup::Admins);
        assert!(to_admins.matches("any", true));
        assert!(!to_admins.matches("any", false));

        let to_buyers = Recipient::Group(RoleGroup::Buyers);
        assert!(to_buyers.matches("any", false));
        assert!(!to_buyers.matches("any", true));
    }

    #[test]
    fn bus_message_roundtrip() {
        let msg = BusMessage::to_group(
            RoleGroup::Admins,
            event::NEW_ORDER,
            serde_json::json!({ "orderNumber": "ORD-12345678-001" }),
        );
        let json = serde_json::to_string(&msg).unwrap();
        let back: BusMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.recipient, Recipient::Group(RoleGroup::Admins));
        assert_eq!(back.event, event::NEW_ORDER);
    }
}
