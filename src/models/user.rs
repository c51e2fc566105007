use crate::entities::{UserRole, user_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "09121234567")]
    pub mobile: String,
    /// Defaults to the normalised mobile when omitted
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(example = "Ali")]
    pub first_name: String,
    #[schema(example = "Rezaei")]
    pub last_name: String,
    pub role: UserRole,
    pub telegram_id: Option<String>,
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UserQuery {
    /// Matches username, names, mobile, email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub mobile: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub telegram_id: Option<String>,
    pub business_name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user_entity::Model> for UserResponse {
    fn from(m: user_entity::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            mobile: m.mobile,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            role: m.role,
            is_active: m.is_active,
            telegram_id: m.telegram_id,
            business_name: m.business_name,
            last_login: m.last_login,
            created_at: m.created_at,
        }
    }
}
