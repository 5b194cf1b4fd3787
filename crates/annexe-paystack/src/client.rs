//! HTTP client for the Paystack REST API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{PaystackError, PaystackResult};
use crate::types::{Bank, Envelope, ResolvedAccount, Subscription, SubscriptionRequest};

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

/// Paystack client configuration.
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub base_url: String,
    /// Secret key, sent as a bearer token.
    pub secret_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl PaystackConfig {
    pub fn from_env() -> PaystackResult<Self> {
        let base_url =
            std::env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let secret_key = std::env::var("PAYSTACK_SECRET_KEY").map_err(|_| {
            PaystackError::ServiceUnavailable("PAYSTACK_SECRET_KEY not set".to_string())
        })?;
        let timeout_secs = std::env::var("PAYSTACK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let max_retries = std::env::var("PAYSTACK_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        Ok(Self {
            base_url,
            secret_key,
            timeout_secs,
            max_retries,
        })
    }
}

/// Client for bank lookups, account resolution and subscriptions.
#[derive(Clone)]
pub struct PaystackClient {
    config: PaystackConfig,
    client: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: PaystackConfig) -> PaystackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PaystackResult<Self> {
        Self::new(PaystackConfig::from_env()?)
    }

    /// List banks supported for transfers in a country.
    pub async fn list_banks(&self, country: &str) -> PaystackResult<Vec<Bank>> {
        let url = format!("{}/bank", self.config.base_url);
        let banks: Vec<Bank> = self
            .request(|client| client.get(&url).query(&[("country", country)]))
            .await?;
        info!(country, count = banks.len(), "Listed banks");
        Ok(banks)
    }

    /// Resolve an account number against a bank code.
    pub async fn resolve_account(
        &self,
        account_number: &str,
        bank_code: &str,
    ) -> PaystackResult<ResolvedAccount> {
        let url = format!("{}/bank/resolve", self.config.base_url);
        self.request(|client| {
            client.get(&url).query(&[
                ("account_number", account_number),
                ("bank_code", bank_code),
            ])
        })
        .await
    }

    /// Create a subscription for a customer on a plan.
    pub async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> PaystackResult<Subscription> {
        let url = format!("{}/subscription", self.config.base_url);
        let subscription: Subscription = self
            .request(|client| client.post(&url).json(request))
            .await?;
        info!(
            customer = %request.customer,
            plan = %request.plan,
            code = %subscription.subscription_code,
            "Created subscription"
        );
        Ok(subscription)
    }

    /// Issue one request with retries on transient failures, unwrap the
    /// Paystack envelope.
    async fn request<T, F>(&self, build: F) -> PaystackResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?delay, "Retrying Paystack request");
                tokio::time::sleep(delay).await;
            }

            match self.request_once(&build).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!(attempt, error = %e, "Transient Paystack failure");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| PaystackError::ServiceUnavailable("retries exhausted".to_string())))
    }

    async fn request_once<T, F>(&self, build: &F) -> PaystackResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let response = build(&self.client)
            .bearer_auth(&self.config.secret_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaystackError::ServiceUnavailable(format!(
                "{status}: {body}"
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| PaystackError::InvalidResponse(e.to_string()))?;

        if !envelope.status {
            return Err(PaystackError::Api(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| PaystackError::InvalidResponse("envelope missing data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> PaystackConfig {
        PaystackConfig {
            base_url,
            secret_key: "sk_test_123".to_string(),
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    #[tokio::test]
    async fn lists_banks_for_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank"))
            .and(query_param("country", "nigeria"))
            .and(bearer_token("sk_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Banks retrieved",
                "data": [
                    {"name": "Access Bank", "code": "044"},
                    {"name": "GTBank", "code": "058"}
                ]
            })))
            .mount(&server)
            .await;

        let client = PaystackClient::new(config(server.uri())).unwrap();
        let banks = client.list_banks("nigeria").await.unwrap();
        assert_eq!(banks.len(), 2);
        assert_eq!(banks[0].code, "044");
    }

    #[tokio::test]
    async fn resolve_failure_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bank/resolve"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "status": false,
                "message": "Could not resolve account name"
            })))
            .mount(&server)
            .await;

        let client = PaystackClient::new(config(server.uri())).unwrap();
        let err = client.resolve_account("0000000000", "044").await.unwrap_err();
        assert!(matches!(err, PaystackError::Api(m) if m.contains("resolve")));
    }

    #[tokio::test]
    async fn creates_subscription() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subscription"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Subscription successfully created",
                "data": {
                    "subscription_code": "SUB_abc",
                    "email_token": "tok",
                    "status": "active"
                }
            })))
            .mount(&server)
            .await;

        let client = PaystackClient::new(config(server.uri())).unwrap();
        let sub = client
            .create_subscription(&SubscriptionRequest {
                customer: "ada@example.com".to_string(),
                plan: "PLN_basic".to_string(),
                authorization: None,
            })
            .await
            .unwrap();
        assert_eq!(sub.subscription_code, "SUB_abc");
    }
}
