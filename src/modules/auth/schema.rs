use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::Principal;

// =============================================================================
// SIGNUP / REGISTER
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, message = "Club name is required"))]
    pub club_name: String,
    #[serde(default)]
    pub plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub club: ClubSnapshot,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, message = "Tenant is required"))]
    pub tenant_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

// =============================================================================
// LOGIN
// =============================================================================

/// Unified login body. Admins send email+password, coaches username+pin;
/// the handler rejects bodies with neither complete pair.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Tenant is required"))]
    pub tenant_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default)]
    pub totp_code: Option<String>,
    #[serde(default)]
    pub backup_code: Option<String>,
}

/// The two complete credential pairs a login body may carry.
pub enum LoginCredentials<'a> {
    EmailPassword { email: &'a str, password: &'a str },
    UsernamePin { username: &'a str, pin: &'a str },
}

impl LoginRequest {
    pub fn credentials(&self) -> Option<LoginCredentials<'_>> {
        if let (Some(email), Some(password)) = (self.email.as_deref(), self.password.as_deref()) {
            return Some(LoginCredentials::EmailPassword { email, password });
        }
        if let (Some(username), Some(pin)) = (self.username.as_deref(), self.pin.as_deref()) {
            return Some(LoginCredentials::UsernamePin { username, pin });
        }
        None
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub club: ClubSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requires2faResponse {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
}

// =============================================================================
// REFRESH / LOGOUT
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// =============================================================================
// EMAIL VERIFICATION / PASSWORD RESET
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Tenant is required"))]
    pub tenant_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    pub password: String,
}

// =============================================================================
// CREDENTIAL CHANGE
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePinRequest {
    #[serde(rename = "currentPIN")]
    #[validate(length(min = 1, message = "Current PIN is required"))]
    pub current_pin: String,
    #[serde(rename = "newPIN")]
    pub new_pin: String,
}

// =============================================================================
// PIN RESET (three-phase endpoint)
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPinAction {
    Request,
    Validate,
    Reset,
}

#[derive(Debug, Deserialize)]
pub struct ResetPinParams {
    pub action: ResetPinAction,
}

/// One body type for all three phases; the handler checks the fields the
/// selected action needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPinBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub pin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetPinValidateResponse {
    pub success: bool,
    pub username: String,
}

// =============================================================================
// TWO-FACTOR
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup2faResponse {
    pub secret: String,
    pub qr_code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Verify2faRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verify2faResponse {
    pub success: bool,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Disable2faRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// =============================================================================
// PROFILE
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClubResponse {
    pub success: bool,
    pub club: ClubSnapshot,
}

// =============================================================================
// PRINCIPAL SNAPSHOT
// =============================================================================

/// Non-secret view of a principal, as returned by every handler.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSnapshot {
    pub id: String,
    pub tenant_id: String,
    pub role: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Principal> for ClubSnapshot {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id.clone(),
            tenant_id: p.tenant_id.clone(),
            role: p.role().as_str().to_string(),
            email: p.email.clone(),
            username: p.username.clone(),
            email_verified: p.email_verified,
            two_factor_enabled: p.two_factor_enabled,
            created_at: p.created_at,
            updated_at: p.updated_at,
            last_login: p.last_login,
        }
    }
}
