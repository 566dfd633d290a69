//! Session tokens: HS256 JWTs carried in an HttpOnly cookie.
//!
//! A Bearer Authorization header is accepted as a fallback so non-browser
//! clients can call the API without cookie handling.

use anyhow::Result;
use axum::http::{HeaderMap, HeaderValue, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Owning user's id.
    pub sub: String,
    pub exp: usize,
}

/// Issue a session token for a user, expiring after `ttl_secs`.
pub fn issue_token(user_id: &str, secret: &str, ttl_secs: i64) -> Result<String> {
    let exp = chrono::Utc::now().timestamp() + ttl_secs;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp as usize,
    };
    let token = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation)?;
    Ok(data.claims)
}

/// `Set-Cookie` value establishing the session.
pub fn session_cookie(token: &str, ttl_secs: i64) -> HeaderValue {
    let value = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, ttl_secs
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` value clearing the session.
pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Pull the session token from the `Cookie` header, falling back to a
/// Bearer Authorization header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(header::COOKIE)
        && let Ok(cookies) = cookie_header.to_str()
    {
        for pair in cookies.split(';') {
            let pair = pair.trim();
            if let Some(value) = pair.strip_prefix("token=")
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }

    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|token| token.trim().to_string())
}
