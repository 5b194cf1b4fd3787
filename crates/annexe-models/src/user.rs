//! User, OTP and bank-detail models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Bank account resolved through the payment gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
}

/// A registered user.
///
/// The password hash never leaves the server; it is skipped on
/// serialization so handler responses can return the record directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_registration_complete: bool,
    #[serde(default)]
    pub bank_details: Vec<BankDetails>,
    /// Payment-gateway transfer recipient, once bank details are resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh, unverified user.
    pub fn new(name: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            password_hash,
            phone: None,
            address: None,
            is_verified: false,
            is_active: false,
            is_admin: false,
            is_registration_complete: false,
            bank_details: Vec::new(),
            recipient_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One-time password issued for account verification or password reset.
///
/// Keyed by email; at most one live record per address. The code itself
/// is stored only as a bcrypt hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(email: impl Into<String>, otp_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            otp_hash,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn password_hash_never_serialized() {
        let user = User::new("Ada", "ada@example.com", "$2b$10$secret".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"isVerified\":false"));
    }

    #[test]
    fn otp_expiry() {
        let now = Utc::now();
        let otp = OtpRecord::new("ada@example.com", "hash".into(), now + Duration::hours(1));
        assert!(!otp.is_expired(now));
        assert!(otp.is_expired(now + Duration::hours(2)));
    }
}
