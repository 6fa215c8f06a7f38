//! Database row models and closed status enums
//!
//! 状态/角色一律用封闭枚举建模（SCREAMING_SNAKE_CASE 存储），
//! 转换函数处逐一 match，新增状态会强制回顾每个转换点。

pub mod notification;
pub mod order;
pub mod product;
pub mod user;

pub use notification::{NewNotification, Notification, NotificationType, Priority};
pub use order::{
    Order, OrderItem, OrderStatus, OrderWithItems, PaymentStatus, ShippingAddress,
};
pub use product::{Product, ProductCreate};
pub use user::{ApprovalStatus, Role, User};
