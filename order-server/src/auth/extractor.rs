//! 主体提取器
//!
//! 从网关注入的请求头提取 [`CurrentUser`]。
//! 头缺失或取值非法一律 401。

use axum::{extract::FromRequestParts, http::request::Parts};

use super::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{ApprovalStatus, Role};
use crate::utils::AppError;

const HEADER_USER_ID: &str = "x-user-id";
const HEADER_ROLE: &str = "x-user-role";
const HEADER_APPROVAL: &str = "x-approval-status";

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user_id = header_str(parts, HEADER_USER_ID)?;
        if user_id.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let role = match header_str(parts, HEADER_ROLE)? {
            "ADMIN" => Role::Admin,
            "BUYER" => Role::Buyer,
            _ => return Err(AppError::Unauthorized),
        };
        let approval_status = match header_str(parts, HEADER_APPROVAL)? {
            "PENDING" => ApprovalStatus::Pending,
            "APPROVED" => ApprovalStatus::Approved,
            "BLOCKED" => ApprovalStatus::Blocked,
            _ => return Err(AppError::Unauthorized),
        };

        let user = CurrentUser {
            user_id: user_id.to_string(),
            role,
            approval_status,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)
}
