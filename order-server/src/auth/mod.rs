//! 受信主体
//!
//! 认证是外部协作方：网关校验身份后以请求头注入主体信息，
//! 本服务按外部接口契约原样信任（`x-user-id` / `x-user-role` /
//! `x-approval-status`）。

mod extractor;

use crate::db::models::{ApprovalStatus, Role};
use crate::utils::AppError;

/// 请求主体
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 管理端接口的角色门槛
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin role required"))
        }
    }
}
