//! 消息总线核心实现
//!
//! # 消息流
//!
//! ```text
//! NotificationService ──▶ publish() ──▶ server_tx ──▶ 订阅者
//!                                                    (连接会话按 Recipient 过滤)
//! ```
//!
//! broadcast 通道语义：订阅者落后超过容量时丢弃最旧消息。
//! 投递是尽力而为，持久化的 notifications 行才是事实来源。

use shared::message::BusMessage;
use tokio::sync::broadcast;

/// 消息总线 - 服务器到订阅者的广播
#[derive(Debug, Clone)]
pub struct MessageBus {
    server_tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
    /// 创建默认容量 (1024) 的消息总线
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// 创建指定容量的消息总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (server_tx, _) = broadcast::channel(capacity);
        Self { server_tx }
    }

    /// 发布消息到所有订阅者
    ///
    /// 没有订阅者时消息被丢弃，不算错误
    pub fn publish(&self, msg: BusMessage) -> usize {
        self.server_tx.send(msg).unwrap_or(0)
    }

    /// 订阅服务器广播
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.server_tx.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{Recipient, RoleGroup};

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = MessageBus::with_capacity(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let msg = BusMessage::to_user("u1", "new_notification", serde_json::json!({"n": 1}));
        assert_eq!(bus.publish(msg.clone()), 1);

        let got = rx.recv().await.unwrap();
        assert_eq!(got.id, msg.id);
        assert_eq!(got.event, "new_notification");
    }

    #[tokio::test]
    async fn subscriber_filters_by_recipient() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        bus.publish(BusMessage::to_group(
            RoleGroup::Admins,
            "new_order",
            serde_json::json!({}),
        ));

        let got = rx.recv().await.unwrap();
        // admin 会话收到，买家会话过滤掉
        assert!(got.recipient.matches("any-admin", true));
        assert!(!got.recipient.matches("buyer-1", false));
        assert!(matches!(got.recipient, Recipient::Group(RoleGroup::Admins)));
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = MessageBus::new();
        let n = bus.publish(BusMessage::to_user("u1", "x", serde_json::json!({})));
        assert_eq!(n, 0);
    }
}
