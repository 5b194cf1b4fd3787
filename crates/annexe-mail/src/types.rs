//! Wire types for the mail provider API.

use serde::{Deserialize, Serialize};

/// Payload accepted by the provider's send endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SendMailRequest {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMailResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
