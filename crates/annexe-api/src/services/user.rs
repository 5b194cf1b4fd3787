//! User account service.
//!
//! Registration, OTP verification, login, password recovery and
//! account state changes. OTPs are six digits, stored only as bcrypt
//! hashes; verification codes live 24 hours, reset codes 1 hour.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use annexe_firestore::{OtpRepository, UserRepository};
use annexe_mail::MailClient;
use annexe_models::{BankDetails, OtpRecord, User, UserId};
use annexe_paystack::PaystackClient;

use crate::auth::issue_token;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

const BCRYPT_COST: u32 = 10;
const VERIFY_OTP_TTL_HOURS: i64 = 24;
const RESET_OTP_TTL_HOURS: i64 = 1;

/// A signed-in session: token plus the user it belongs to.
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<UserRepository>,
    otps: Arc<OtpRepository>,
    mail: Arc<MailClient>,
    paystack: Arc<PaystackClient>,
    config: ApiConfig,
}

impl UserService {
    pub fn new(
        users: Arc<UserRepository>,
        otps: Arc<OtpRepository>,
        mail: Arc<MailClient>,
        paystack: Arc<PaystackClient>,
        config: ApiConfig,
    ) -> Self {
        Self {
            users,
            otps,
            mail,
            paystack,
            config,
        }
    }

    /// Register a new account and mail out a verification code.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        phone: Option<String>,
        address: Option<String>,
    ) -> ApiResult<User> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(ApiError::bad_request(
                "An account with this email already exists",
            ));
        }

        let password_hash = bcrypt::hash(password, BCRYPT_COST)?;
        let mut user = User::new(name, email, password_hash);
        user.phone = phone;
        user.address = address;

        self.users.create(&user).await?;
        info!(user_id = %user.id, "User registered");

        self.issue_otp(email, VERIFY_OTP_TTL_HOURS, |code| {
            let mail = Arc::clone(&self.mail);
            let user = user.clone();
            async move { mail.send_account_verification(&user, &code).await }
        })
        .await?;

        Ok(user)
    }

    /// Confirm a verification code, activate the account and sign in.
    pub async fn verify(&self, email: &str, otp: &str) -> ApiResult<Session> {
        let mut user = self.require_by_email(email).await?;
        if user.is_verified {
            return Err(ApiError::bad_request("Account is already verified"));
        }

        self.confirm_otp(email, otp).await?;

        user.is_verified = true;
        user.is_active = true;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Account verified");

        if let Err(e) = self.mail.send_welcome(&user).await {
            warn!(user_id = %user.id, "Failed to send welcome mail: {}", e);
        }

        let token = issue_token(&user, &self.config)?;
        Ok(Session { token, user })
    }

    /// Reissue a verification code for an unverified account.
    pub async fn resend_otp(&self, email: &str) -> ApiResult<()> {
        let user = self.require_by_email(email).await?;
        if user.is_verified {
            return Err(ApiError::bad_request("Account is already verified"));
        }

        self.issue_otp(email, VERIFY_OTP_TTL_HOURS, |code| {
            let mail = Arc::clone(&self.mail);
            let user = user.clone();
            async move { mail.send_account_verification(&user, &code).await }
        })
        .await
    }

    /// Password login. All failures read the same to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Session> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

        if !bcrypt::verify(password, &user.password_hash)? {
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
        if !user.is_verified {
            return Err(ApiError::unauthorized("Please verify your account first"));
        }
        if !user.is_active {
            return Err(ApiError::unauthorized("Account is deactivated"));
        }

        let token = issue_token(&user, &self.config)?;
        Ok(Session { token, user })
    }

    /// Start a password reset. Succeeds whether or not the address is
    /// registered, so the endpoint cannot be used to probe for accounts.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        self.issue_otp(email, RESET_OTP_TTL_HOURS, |code| {
            let mail = Arc::clone(&self.mail);
            let user = user.clone();
            async move { mail.send_forgot_password(&user, &code).await }
        })
        .await
    }

    /// Finish a password reset with the mailed code.
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> ApiResult<()> {
        if new_password != confirm_password {
            return Err(ApiError::bad_request("Passwords do not match"));
        }

        let mut user = self.require_by_email(email).await?;
        self.confirm_otp(email, otp).await?;

        user.password_hash = bcrypt::hash(new_password, BCRYPT_COST)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Password reset");

        if let Err(e) = self.mail.send_password_reset_success(&user).await {
            warn!(user_id = %user.id, "Failed to send reset confirmation: {}", e);
        }
        Ok(())
    }

    /// Change password for a signed-in user.
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let mut user = self.require_by_id(user_id).await?;

        if !user.is_verified {
            return Err(ApiError::unauthorized("Please verify your account first"));
        }
        if !user.is_active {
            return Err(ApiError::unauthorized("Account is deactivated"));
        }
        if !bcrypt::verify(old_password, &user.password_hash)? {
            return Err(ApiError::bad_request("Current password is incorrect"));
        }

        user.password_hash = bcrypt::hash(new_password, BCRYPT_COST)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        Ok(())
    }

    /// One-shot profile completion: contact details plus a bank account
    /// resolved through the payment gateway.
    pub async fn complete_registration(
        &self,
        user_id: &UserId,
        phone: String,
        address: String,
        bank_name: String,
        bank_code: String,
        account_number: String,
    ) -> ApiResult<User> {
        let mut user = self.require_by_id(user_id).await?;
        if user.is_registration_complete {
            return Err(ApiError::bad_request("Registration is already complete"));
        }

        let resolved = self
            .paystack
            .resolve_account(&account_number, &bank_code)
            .await?;

        user.phone = Some(phone);
        user.address = Some(address);
        user.bank_details.push(BankDetails {
            bank_name,
            bank_code,
            account_number: resolved.account_number,
            account_name: resolved.account_name,
        });
        user.is_registration_complete = true;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        info!(user_id = %user.id, "Registration completed");

        Ok(user)
    }

    pub async fn deactivate(&self, user_id: &UserId) -> ApiResult<()> {
        let mut user = self.require_by_id(user_id).await?;
        if !user.is_active {
            return Err(ApiError::bad_request("Account is already deactivated"));
        }
        user.is_active = false;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        Ok(())
    }

    pub async fn activate(&self, user_id: &UserId) -> ApiResult<()> {
        let mut user = self.require_by_id(user_id).await?;
        if user.is_active {
            return Err(ApiError::bad_request("Account is already active"));
        }

        user.is_active = true;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;
        Ok(())
    }

    pub async fn get(&self, user_id: &UserId) -> ApiResult<User> {
        self.require_by_id(user_id).await
    }

    async fn require_by_email(&self, email: &str) -> ApiResult<User> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn require_by_id(&self, user_id: &UserId) -> ApiResult<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Generate, hash and store a six-digit code, then hand the clear
    /// text to the mailer closure.
    async fn issue_otp<F, Fut>(&self, email: &str, ttl_hours: i64, send: F) -> ApiResult<()>
    where
        F: FnOnce(String) -> Fut,
        Fut: std::future::Future<Output = annexe_mail::MailResult<()>>,
    {
        let code = generate_otp();
        let otp_hash = bcrypt::hash(&code, BCRYPT_COST)?;
        let record = OtpRecord::new(email, otp_hash, Utc::now() + Duration::hours(ttl_hours));
        self.otps.upsert(&record).await?;

        send(code).await?;
        Ok(())
    }

    /// Check a submitted code against the stored hash and consume it.
    async fn confirm_otp(&self, email: &str, otp: &str) -> ApiResult<()> {
        let record = self
            .otps
            .get(email)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid or expired OTP"))?;

        if record.is_expired(Utc::now()) {
            self.otps.delete(email).await?;
            return Err(ApiError::bad_request("Invalid or expired OTP"));
        }
        if !bcrypt::verify(otp, &record.otp_hash)? {
            return Err(ApiError::bad_request("Invalid or expired OTP"));
        }

        self.otps.delete(email).await?;
        Ok(())
    }
}

/// Six-digit numeric code.
fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.parse::<u32>().is_ok());
        }
    }
}
