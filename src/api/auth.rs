//! Account endpoints: registration, verification, sessions.

use crate::api::{ApiResponse, state::AppState};
use crate::auth::{password, require_user, session};
use crate::email::deliver_verification;
use crate::error::ApiError;
use crate::models::User;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account, safe to return to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub is_verified: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            is_verified: user.is_verified,
        }
    }
}

// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    if request.password != request.confirm_password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if request.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if state.storage.users.find_by_email(&email)?.is_some() {
        return Err(ApiError::bad_request("Email already in use"));
    }

    let password_hash = password::hash_password(&request.password)?;
    let user = User::new(request.username.trim().to_string(), email, password_hash);
    state.storage.users.create(&user)?;

    if let Some(token) = &user.verification_token {
        deliver_verification(state.mailer.as_ref(), &user, token).await;
    }

    tracing::info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            UserProfile::from(&user),
            "Registered, check your email to verify the account",
        )),
    ))
}

// GET /api/auth/verify/{token}
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let mut user = state
        .storage
        .users
        .find_by_verification_token(&token)?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired token"))?;

    user.is_verified = true;
    user.verification_token = None;
    state.storage.users.update(&user)?;

    tracing::info!(user_id = %user.id, "account verified");
    Ok(Json(ApiResponse::message("Email verified")))
}

// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<UserProfile>>), ApiError> {
    let email = request.email.trim().to_lowercase();
    let user = state
        .storage
        .users
        .find_by_email(&email)?
        .ok_or_else(|| ApiError::bad_request("Invalid credentials"))?;

    if !user.is_verified {
        return Err(ApiError::bad_request("Email not verified"));
    }
    if !password::verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let ttl = state.config.auth.session_ttl_secs;
    let token = session::issue_token(&user.id, &state.config.auth.jwt_secret, ttl)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session::session_cookie(&token, ttl));

    Ok((
        headers,
        Json(ApiResponse::ok_with_message(
            UserProfile::from(&user),
            "Login successful",
        )),
    ))
}

// POST /api/auth/logout
pub async fn logout() -> (HeaderMap, Json<ApiResponse<()>>) {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session::clear_cookie());
    (headers, Json(ApiResponse::message("Logged out")))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(ApiResponse::ok(UserProfile::from(&user))))
}

// DELETE /api/auth/account
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<ApiResponse<()>>), ApiError> {
    let user = require_user(&state, &headers)?;

    let removed_chats = state.storage.chats.delete_all_for_owner(&user.id)?;
    state.storage.users.delete(&user.id)?;
    tracing::info!(user_id = %user.id, removed_chats, "account deleted");

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, session::clear_cookie());
    Ok((headers, Json(ApiResponse::message("Account deleted"))))
}
