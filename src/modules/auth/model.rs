use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Authorisation class of a principal. `sysadmin` is a legacy synonym for
/// `super_admin`, normalised on read and never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coach,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "coach" => Some(Role::Coach),
            "admin" => Some(Role::Admin),
            "super_admin" | "sysadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// One row per human who can authenticate, across every tenant. Admins carry
/// `password_hash`, coaches carry `pin_hash`; never both.
#[derive(Debug, Clone, FromRow)]
pub struct Principal {
    pub id: String,
    pub tenant_id: String,
    pub role: String,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub pin_hash: Option<String>,
    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub pin_reset_token: Option<String>,
    pub pin_reset_expires: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub two_factor_backup_codes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Principal {
    /// Unknown role strings fall back to the least-privileged class.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Coach)
    }

    /// Stored backup-code hashes, deserialised from the JSON column.
    pub fn backup_code_hashes(&self) -> Vec<String> {
        self.two_factor_backup_codes
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub principal_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
