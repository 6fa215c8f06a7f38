//! 推送能力接口
//!
//! 推送是注入的能力，不是环境全局。生产实现发布到 [`MessageBus`]，
//! 测试用 Noop / 录制假件。所有推送都是尽力而为，失败不冒泡。

use async_trait::async_trait;
use serde_json::Value;
use shared::message::{BusMessage, RoleGroup};

use crate::message::MessageBus;

/// 实时推送能力
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// 推送给单个用户的所有连接会话
    async fn send_to_user(&self, user_id: &str, event: &str, payload: Value);

    /// 推送给一个角色组的所有连接会话
    async fn send_to_group(&self, group: RoleGroup, event: &str, payload: Value);
}

/// 生产实现：发布到进程内消息总线
pub struct BusBroadcaster {
    bus: MessageBus,
}

impl BusBroadcaster {
    pub fn new(bus: MessageBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Broadcaster for BusBroadcaster {
    async fn send_to_user(&self, user_id: &str, event: &str, payload: Value) {
        let delivered = self.bus.publish(BusMessage::to_user(user_id, event, payload));
        tracing::debug!(target: "notify", user_id, event, delivered, "push to user");
    }

    async fn send_to_group(&self, group: RoleGroup, event: &str, payload: Value) {
        let delivered = self.bus.publish(BusMessage::to_group(group, event, payload));
        tracing::debug!(target: "notify", ?group, event, delivered, "push to group");
    }
}

/// 不推送的实现（批处理 / 离线工具用）
pub struct NoopBroadcaster;

#[async_trait]
impl Broadcaster for NoopBroadcaster {
    async fn send_to_user(&self, _user_id: &str, _event: &str, _payload: Value) {}

    async fn send_to_group(&self, _group: RoleGroup, _event: &str, _payload: Value) {}
}

#[cfg(test)]
pub mod testing {
    //! 录制假件：测试断言推送行为用

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Push {
        User {
            user_id: String,
            event: String,
            payload: Value,
        },
        Group {
            group: RoleGroup,
            event: String,
            payload: Value,
        },
    }

    #[derive(Default)]
    pub struct RecordingBroadcaster {
        pub pushes: Mutex<Vec<Push>>,
    }

    impl RecordingBroadcaster {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn pushes(&self) -> Vec<Push> {
            self.pushes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Broadcaster for RecordingBroadcaster {
        async fn send_to_user(&self, user_id: &str, event: &str, payload: Value) {
            self.pushes.lock().unwrap().push(Push::User {
                user_id: user_id.to_string(),
                event: event.to_string(),
                payload,
            });
        }

        async fn send_to_group(&self, group: RoleGroup, event: &str, payload: Value) {
            self.pushes.lock().unwrap().push(Push::Group {
                group,
                event: event.to_string(),
                payload,
            });
        }
    }
}
