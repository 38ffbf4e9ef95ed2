//! Caller identity
//!
//! Authentication happens upstream. The gateway forwards the verified user
//! id and role as `X-User-Id` and `X-User-Role`; handlers take a [`Caller`]
//! argument and check the role they need.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Teacher,
    Student,
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> ApiResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(ApiError::Unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

/// Authenticated caller as forwarded by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::SuperAdmin | Role::Admin)
    }

    /// Admins and teachers
    pub fn is_staff(&self) -> bool {
        self.role != Role::Student
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required".to_string()))
        }
    }

    pub fn require_staff(&self) -> ApiResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin or teacher role required".to_string()))
        }
    }

    /// Staff may act on any student's records, students only on their own
    pub fn require_self_or_staff(&self, student_id: &str) -> ApiResult<()> {
        if self.is_staff() || self.user_id == student_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "enrollment belongs to another student".to_string(),
            ))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> ApiResult<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> ApiResult<Self> {
        let user_id = header(parts, USER_ID_HEADER)?.to_string();
        let role = header(parts, USER_ROLE_HEADER)?.parse::<Role>()?;
        Ok(Caller { user_id, role })
    }
}
