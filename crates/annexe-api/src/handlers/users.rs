//! User account handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use annexe_models::User;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::user::Session;
use crate::state::AppState;

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            success: true,
            token: session.token,
            user: session.user,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistrationRequest {
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "Bank name is required"))]
    pub bank_name: String,
    #[validate(length(min = 1, message = "Bank code is required"))]
    pub bank_code: String,
    #[validate(length(min = 10, max = 10, message = "Account number must be 10 digits"))]
    pub account_number: String,
}

/// POST /user/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state
        .user_service
        .register(
            &payload.name,
            &payload.email,
            &payload.password,
            payload.phone,
            payload.address,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::ok("Registration successful. Please check your email for a verification code."),
    ))
}

/// POST /user/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = state
        .user_service
        .verify(&payload.email, &payload.otp)
        .await?;
    Ok(Json(session.into()))
}

/// POST /user/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.user_service.resend_otp(&payload.email).await?;
    Ok(MessageResponse::ok(
        "A new verification code has been sent to your email.",
    ))
}

/// POST /user/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let session = state
        .user_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(session.into()))
}

/// POST /user/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.user_service.forgot_password(&payload.email).await?;
    Ok(MessageResponse::ok(
        "If an account exists for this email, a reset code has been sent.",
    ))
}

/// POST /user/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state
        .user_service
        .reset_password(
            &payload.email,
            &payload.otp,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;
    Ok(MessageResponse::ok("Password has been reset successfully."))
}

/// PATCH /user/password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    state
        .user_service
        .change_password(&user.id, &payload.old_password, &payload.new_password)
        .await?;
    Ok(MessageResponse::ok("Password updated successfully."))
}

/// PATCH /user/complete-registration
pub async fn complete_registration(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CompleteRegistrationRequest>,
) -> ApiResult<Json<User>> {
    payload
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let user = state
        .user_service
        .complete_registration(
            &user.id,
            payload.phone,
            payload.address,
            payload.bank_name,
            payload.bank_code,
            payload.account_number,
        )
        .await?;
    Ok(Json(user))
}

/// PATCH /user/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    state.user_service.deactivate(&user.id).await?;
    Ok(MessageResponse::ok("Account deactivated."))
}

/// PATCH /user/activate
pub async fn activate(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    state.user_service.activate(&user.id).await?;
    Ok(MessageResponse::ok("Account activated."))
}

/// GET /user/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    let user = state.user_service.get(&user.id).await?;
    Ok(Json(user))
}
