use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::{Role, User};

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub telephone: Option<String>,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub telephone: Option<String>,
    pub email: String,
    pub role: Role,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            telephone: user.telephone,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub token_type: &'static str,
    pub expires_in_seconds: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}
