//! Bank and subscription handlers, backed by Paystack.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use annexe_models::BankDetails;
use annexe_paystack::{Bank, ResolvedAccount, Subscription, SubscriptionRequest};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BankListQuery {
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "nigeria".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAccountRequest {
    pub account_number: String,
    pub bank_code: String,
    pub bank_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan: String,
}

/// GET /bank/list?country=
pub async fn list_banks(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<BankListQuery>,
) -> ApiResult<Json<Vec<Bank>>> {
    let banks = state.paystack.list_banks(&query.country).await?;
    Ok(Json(banks))
}

/// POST /bank/resolve
///
/// Resolves the account against the gateway and records the confirmed
/// details on the caller's profile.
pub async fn resolve_account(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ResolveAccountRequest>,
) -> ApiResult<Json<ResolvedAccount>> {
    let resolved = state
        .paystack
        .resolve_account(&payload.account_number, &payload.bank_code)
        .await?;

    let mut account = state
        .users
        .get(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let already_recorded = account
        .bank_details
        .iter()
        .any(|b| b.account_number == resolved.account_number && b.bank_code == payload.bank_code);
    if !already_recorded {
        account.bank_details.push(BankDetails {
            bank_name: payload.bank_name,
            bank_code: payload.bank_code,
            account_number: resolved.account_number.clone(),
            account_name: resolved.account_name.clone(),
        });
        state.users.save(&account).await?;
    }

    Ok(Json(resolved))
}

/// POST /bank/subscription
pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<Subscription>> {
    let subscription = state
        .paystack
        .create_subscription(&SubscriptionRequest {
            customer: user.email,
            plan: payload.plan,
            authorization: None,
        })
        .await?;
    Ok(Json(subscription))
}
