//! User account model.

use serde::{Deserialize, Serialize};

/// Registered user. `verification_token` is present until the email
/// verification link is visited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    pub created_at: i64,
}

impl User {
    pub fn new(display_name: String, email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name,
            email,
            password_hash,
            is_verified: false,
            verification_token: Some(format!("vt_{}", uuid::Uuid::new_v4().simple())),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
