//! HTTP client for the transactional mail provider.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use annexe_models::{Auction, User};

use crate::error::{MailError, MailResult};
use crate::templates::{self, RenderedMail};
use crate::types::{SendMailRequest, SendMailResponse};

/// Mail client configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Provider base URL, e.g. `https://api.resend.com`
    pub base_url: String,
    /// Provider API key
    pub api_key: String,
    /// Sender address
    pub from: String,
    /// Frontend base URL used in links, trailing slash included
    pub frontend_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl MailConfig {
    pub fn from_env() -> MailResult<Self> {
        let base_url = std::env::var("MAIL_API_URL")
            .unwrap_or_else(|_| "https://api.resend.com".to_string());
        let api_key = std::env::var("MAIL_API_KEY")
            .map_err(|_| MailError::ServiceUnavailable("MAIL_API_KEY not set".to_string()))?;
        let from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Annexe <no-reply@annexe.app>".to_string());
        let mut frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000/".to_string());
        if !frontend_url.ends_with('/') {
            frontend_url.push('/');
        }

        let timeout_secs = std::env::var("MAIL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let max_retries = std::env::var("MAIL_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        Ok(Self {
            base_url,
            api_key,
            from,
            frontend_url,
            timeout_secs,
            max_retries,
        })
    }
}

/// Client for sending transactional mail.
///
/// Sends are fire-and-forget from the caller's perspective in the
/// notification path; handlers that need delivery confirmation (account
/// verification) propagate the error instead.
#[derive(Clone)]
pub struct MailClient {
    config: MailConfig,
    client: reqwest::Client,
}

impl MailClient {
    pub fn new(config: MailConfig) -> MailResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> MailResult<Self> {
        Self::new(MailConfig::from_env()?)
    }

    /// Send one rendered message, retrying transient failures.
    async fn send(&self, to: &str, mail: RenderedMail) -> MailResult<()> {
        let request = SendMailRequest {
            from: self.config.from.clone(),
            to: to.to_string(),
            subject: mail.subject.clone(),
            html: mail.html,
        };

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?delay, "Retrying mail send");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&request).await {
                Ok(response) => {
                    info!(
                        to,
                        subject = %mail.subject,
                        message_id = response.id.as_deref().unwrap_or("-"),
                        "Mail sent"
                    );
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!(attempt, error = %e, "Transient mail failure");
                    last_error = Some(e);
                }
                Err(e) => {
                    error!(to, subject = %mail.subject, error = %e, "Mail send failed");
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| MailError::SendFailed("retries exhausted".to_string())))
    }

    async fn send_once(&self, request: &SendMailRequest) -> MailResult<SendMailResponse> {
        let url = format!("{}/emails", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::ServiceUnavailable(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::SendFailed(format!("{status}: {body}")));
        }

        response
            .json::<SendMailResponse>()
            .await
            .map_err(|e| MailError::InvalidResponse(e.to_string()))
    }

    pub async fn send_account_verification(&self, user: &User, code: &str) -> MailResult<()> {
        self.send(
            &user.email,
            templates::account_verification(user, code, &self.config.frontend_url),
        )
        .await
    }

    pub async fn send_welcome(&self, user: &User) -> MailResult<()> {
        self.send(&user.email, templates::welcome(user, &self.config.frontend_url))
            .await
    }

    pub async fn send_forgot_password(&self, user: &User, code: &str) -> MailResult<()> {
        self.send(
            &user.email,
            templates::forgot_password(user, code, &self.config.frontend_url),
        )
        .await
    }

    pub async fn send_password_reset_success(&self, user: &User) -> MailResult<()> {
        self.send(&user.email, templates::password_reset_success(user))
            .await
    }

    pub async fn send_auction_started(&self, user: &User, auction: &Auction) -> MailResult<()> {
        self.send(
            &user.email,
            templates::auction_started(user, auction, &self.config.frontend_url),
        )
        .await
    }

    pub async fn send_auction_winner(&self, user: &User, auction: &Auction) -> MailResult<()> {
        self.send(&user.email, templates::auction_winner(user, auction))
            .await
    }

    pub async fn send_auction_ended(&self, user: &User, auction: &Auction) -> MailResult<()> {
        self.send(&user.email, templates::auction_ended(user, auction))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> MailConfig {
        MailConfig {
            base_url,
            api_key: "test-key".to_string(),
            from: "Annexe <no-reply@annexe.test>".to_string(),
            frontend_url: "https://annexe.test/".to_string(),
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    #[tokio::test]
    async fn sends_welcome_mail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(bearer_token("test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = MailClient::new(config(server.uri())).unwrap();
        let user = User::new("Ada", "ada@example.com", "h".to_string());
        client.send_welcome(&user).await.unwrap();
    }

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-2"
            })))
            .mount(&server)
            .await;

        let client = MailClient::new(config(server.uri())).unwrap();
        let user = User::new("Ada", "ada@example.com", "h".to_string());
        client.send_password_reset_success(&user).await.unwrap();
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422))
            .expect(1)
            .mount(&server)
            .await;

        let client = MailClient::new(config(server.uri())).unwrap();
        let user = User::new("Ada", "bad-address", "h".to_string());
        let err = client.send_welcome(&user).await.unwrap_err();
        assert!(matches!(err, MailError::SendFailed(_)));
    }
}
