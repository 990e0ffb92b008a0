use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub path: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidEmailCredentials,

    #[error("Invalid username or PIN")]
    InvalidPinCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Email not verified. Please check your inbox for the verification link.")]
    EmailNotVerified,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Current password is incorrect")]
    IncorrectCurrentPassword,

    #[error("Current PIN is incorrect")]
    IncorrectCurrentPin,

    #[error("Not found")]
    NotFound,

    #[error("Subdomain is already taken")]
    SubdomainTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Coach limit reached for the current plan")]
    PlanLimitReached,

    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    #[error("Too many login attempts. Try again later.")]
    RateLimited { lockout_until: DateTime<Utc> },

    #[error("Validation error")]
    Validation { details: Vec<ValidationDetail> },

    #[error("Failed to send email")]
    EmailDelivery,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Tenant store error: {0}")]
    TenantStore(#[from] crate::tenants::TenantStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Single-field validation failure.
    pub fn validation(path: &str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            details: vec![ValidationDetail {
                path: path.to_string(),
                message: message.into(),
            }],
        }
    }

    /// Every rule a password broke, as one 400 with a details array.
    pub fn password_problems(problems: Vec<String>) -> Self {
        AuthError::Validation {
            details: problems
                .into_iter()
                .map(|message| ValidationDetail {
                    path: "password".to_string(),
                    message,
                })
                .collect(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEmailCredentials
            | Self::InvalidPinCredentials
            | Self::Unauthorized
            | Self::InvalidRefreshToken
            | Self::IncorrectCurrentPassword
            | Self::IncorrectCurrentPin
            | Self::InvalidTwoFactorCode => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::EmailNotVerified | Self::PlanLimitReached => {
                StatusCode::FORBIDDEN
            }
            Self::InvalidToken
            | Self::Validation { .. }
            | Self::TwoFactorAlreadyEnabled
            | Self::TwoFactorNotEnabled => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SubdomainTaken | Self::EmailTaken | Self::UsernameTaken => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::EmailDelivery | Self::Database(_) | Self::TenantStore(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AuthError::Validation { details } => json!({
                "error": "Validation error",
                "details": details,
            }),
            AuthError::RateLimited { lockout_until } => json!({
                "error": self.to_string(),
                "lockoutUntil": lockout_until,
            }),
            AuthError::Database(_) | AuthError::TenantStore(_) | AuthError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                if cfg!(debug_assertions) {
                    json!({ "error": "Internal server error", "detail": self.to_string() })
                } else {
                    json!({ "error": "Internal server error" })
                }
            }
            AuthError::EmailDelivery => {
                tracing::error!("email delivery failure surfaced to client");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Maps `validator` derive output onto the wire shape
/// `{error:"Validation error", details:[{path,message}]}`.
impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationDetail {
                    path: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {field}")),
                })
            })
            .collect();
        AuthError::Validation { details }
    }
}
