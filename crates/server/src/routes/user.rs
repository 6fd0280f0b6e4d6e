//! Account route handlers under `/api/user`.
//!
//! Bodies and responses use the storefront's camelCase JSON. Every response
//! carries `success`; rejections come back as `success: false` with a
//! message via [`AppError`].

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use bazaar_core::AccountId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::JsonBody;
use crate::middleware::RequireUser;
use crate::models::{Account, CartData};
use crate::services::auth::{AuthError, LoginOutcome, Profile};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    #[serde(alias = "code")]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Client network identifier used for new-device notices.
    #[serde(default, alias = "localIp")]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct EditProfileRequest {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<serde_json::Value>,
}

/// Account id as scanned from a QR payload: a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AccountIdParam {
    Number(i32),
    Text(String),
}

impl AccountIdParam {
    fn parse(&self) -> Option<AccountId> {
        match self {
            Self::Number(n) => Some(AccountId::new(*n)),
            Self::Text(s) => s.trim().parse().ok().map(AccountId::new),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrLoginRequest {
    pub user_id: AccountIdParam,
    pub token: String,
    #[serde(default, alias = "localIp")]
    pub device_id: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    const fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
}

/// Public view of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<serde_json::Value>,
    pub joined: chrono::DateTime<chrono::Utc>,
    pub cart_data: CartData,
}

impl From<Account> for UserView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email.into_inner(),
            phone: account.phone,
            address: account.address,
            joined: account.joined_at,
            cart_data: account.cart,
        }
    }
}

/// Account view plus the one-time token the QR code encodes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: UserView,
    pub one_time_login_token: String,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        Self {
            user: profile.account.into(),
            one_time_login_token: profile.one_time_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: ProfileView,
}

#[derive(Debug, Serialize)]
pub struct EditProfileResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: UserView,
}

fn login_response(outcome: &LoginOutcome, kind: &str) -> Json<TokenResponse> {
    let account_id = outcome.account_id.to_string();
    add_breadcrumb(
        "auth",
        kind,
        Some(&[
            ("account_id", account_id.as_str()),
            ("new_device", if outcome.new_device { "true" } else { "false" }),
        ]),
    );
    Json(TokenResponse {
        success: true,
        message: outcome.message(),
        token: outcome.token.clone(),
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/user/register
///
/// # Errors
///
/// Returns `AppError` for rejections and storage/delivery faults.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    let outcome = state
        .auth()
        .register(&req.name, &req.email, &req.password)
        .await?;
    Ok(Json(MessageResponse::ok(outcome.message())))
}

/// POST /api/user/verifyotp
///
/// # Errors
///
/// Returns `AppError` for rejections and storage faults.
pub async fn verify_code(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyCodeRequest>,
) -> Result<Json<TokenResponse>> {
    let outcome = state.auth().verify_code(&req.email, &req.otp).await?;
    add_breadcrumb("auth", "Account verified", None);
    Ok(Json(TokenResponse {
        success: true,
        message: "Account verified successfully",
        token: outcome.token,
    }))
}

/// POST /api/user/login
///
/// # Errors
///
/// Returns `AppError` for rejections and storage faults.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let outcome = state
        .auth()
        .login(&req.email, &req.password, req.device_id.as_deref())
        .await?;
    Ok(login_response(&outcome, "Password login"))
}

/// POST /api/user/qrlogin
///
/// # Errors
///
/// Returns `AppError` for rejections and storage faults.
pub async fn qr_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<QrLoginRequest>,
) -> Result<Json<TokenResponse>> {
    let account_id = req
        .user_id
        .parse()
        .ok_or(AppError::Auth(AuthError::QrInvalid))?;
    let outcome = state
        .auth()
        .qr_login(account_id, &req.token, req.device_id.as_deref())
        .await?;
    Ok(login_response(&outcome, "QR login"))
}

/// POST /api/user/admin
///
/// # Errors
///
/// Returns `AppError` for rejections.
pub async fn admin_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AdminLoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state.auth().admin_login(&req.email, &req.password)?;
    Ok(Json(TokenResponse {
        success: true,
        message: "Admin login successful",
        token,
    }))
}

/// POST /api/user/profile
///
/// # Errors
///
/// Returns `AppError` if the account is gone or storage fails.
pub async fn profile(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
) -> Result<Json<ProfileResponse>> {
    let profile = state.auth().fetch_profile(account_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user: profile.into(),
    }))
}

/// POST /api/user/editProfile
///
/// # Errors
///
/// Returns `AppError` for rejections and storage faults.
pub async fn edit_profile(
    State(state): State<AppState>,
    RequireUser(account_id): RequireUser,
    JsonBody(req): JsonBody<EditProfileRequest>,
) -> Result<Json<EditProfileResponse>> {
    let account = state
        .auth()
        .edit_profile(account_id, &req.name, &req.email, req.phone, req.address)
        .await?;
    Ok(Json(EditProfileResponse {
        success: true,
        message: "Profile updated successfully",
        user: account.into(),
    }))
}
