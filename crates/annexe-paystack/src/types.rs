//! Paystack wire types.
//!
//! Every Paystack response wraps its payload in the same envelope:
//! `{ "status": bool, "message": string, "data": ... }`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// One entry from the bank list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default, rename = "type")]
    pub bank_type: String,
}

/// Result of resolving an account number against a bank code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAccount {
    pub account_number: String,
    pub account_name: String,
}

/// Subscription creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest {
    /// Customer email or customer code
    pub customer: String,
    /// Plan code
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
}

/// Created subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_code: String,
    #[serde(default)]
    pub email_token: String,
    #[serde(default)]
    pub status: String,
}
