use axum::{extract::State, Json, Extension};
use axum::http::StatusCode;
use crate::auth::jwt::sign_token;
use crate::auth::password::{hash_password, verify_password};
use crate::dtos::ApiResponse;
use crate::dtos::user::{RegisterUserRequest, UserResponse, LoginRequest, TokenResponse, MessageResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::{NewUser, Role, User};
use crate::state::AppState;

fn token_response(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    let hours = state.config.jwt_expire_hours;
    let token = sign_token(user.id, user.role, &user.name, &state.config.jwt_secret, hours)?;
    Ok(TokenResponse {
        success: true,
        token,
        token_type: "Bearer",
        expires_in_seconds: hours * 60 * 60,
    })
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let role = match payload.role.as_deref() {
        None => Role::User,
        Some(r) => Role::parse(r).ok_or_else(|| AppError::validation("Invalid role"))?,
    };
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Please add a name"));
    }
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("Please add a valid email"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::validation("Password too short"));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;

    let user = state
        .store
        .create_user(NewUser {
            name: name.to_string(),
            telephone: payload.telephone,
            email,
            password_hash,
            role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "user registered");

    Ok((StatusCode::CREATED, Json(token_response(&state, &user)?)))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (email, password) = match (payload.email, payload.password) {
        (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => (e, p),
        _ => return Err(AppError::validation("Please provide an email and password")),
    };

    let user = state
        .store
        .find_user_by_email(&email.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::validation("Invalid credentials"))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    Ok(Json(token_response(&state, &user)?))
}

// Tokens are stateless; the client drops its copy.
pub async fn logout_user() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully",
    })
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state
        .store
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(user.into())))
}
