//! Sign-up and login.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::ApiResult;
use fintrack_core::auth::{hash_password, validate_signup, verify_password};
use fintrack_shared::AppError;
use fintrack_shared::types::UserId;

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
}

/// Request body for sign-up.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Login email.
    #[serde(default)]
    pub email: String,
    /// Plaintext password.
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalised email.
    pub email: String,
}

/// Response body for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token.
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    /// The logged-in user.
    pub user: UserInfo,
}

/// POST /api/auth/signup - Register a new user.
async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let signup = validate_signup(&payload.name, &payload.email, &payload.password)?;
    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(&signup.name, &signup.email, &password_hash)
        .await?;

    info!(user_id = %user.id, "Sign-up completed");
    Ok((
        StatusCode::CREATED,
        Json(UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
        }),
    ))
}

/// POST /api/auth/login - Exchange credentials for a bearer token.
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        info!("Login attempt for unknown email");
        return Err(invalid().into());
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(invalid().into());
    }

    let token = state.jwt_service.generate_access_token(user.id, &user.name)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        expires_in: state.jwt_service.access_token_expires_in(),
        user: UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    }))
}
