use axum::{response::{Response, IntoResponse}};
use axum::extract::{Request, State};
use axum::middleware::Next;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::models::Role;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
    pub name: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self, msg: &str) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden(msg))
        }
    }

    /// Owners and admins may touch a user's resources.
    pub fn can_act_for(&self, owner_id: i64) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let auth_header = match req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return AppError::unauthorized("Not authorized to access this route").into_response(),
    };

    // Expect "Bearer <token>"
    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return AppError::unauthorized("Invalid Authorization format").into_response(),
    };

    let claims = match verify_token(token, &state.config.jwt_secret) {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
        name: claims.name,
    });

    next.run(req).await
}
