pub mod password;
pub mod session;

use crate::AppCore;
use crate::error::ApiError;
use crate::models::User;
use axum::http::HeaderMap;

/// Resolve the calling user from request headers.
///
/// The turn is only allowed for verified accounts; an unverified user gets
/// the same Unauthorized outcome as a missing or invalid token.
pub fn require_user(core: &AppCore, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = session::extract_token(headers)
        .ok_or_else(|| ApiError::unauthorized("Missing session token"))?;

    let claims = session::verify_token(&token, &core.config.auth.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid or expired session"))?;

    let user = core
        .storage
        .users
        .get(&claims.sub)?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_verified {
        return Err(ApiError::unauthorized("Account not verified"));
    }

    Ok(user)
}
