//! Shared types for the wholesale order platform
//!
//! Common types used by the order server and any client of the realtime
//! bus: message envelope, recipient addressing, event names and small
//! time utilities.

pub mod message;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, Recipient, RoleGroup, event};
