use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppEnv;
use crate::services::{hashing, totp};
use crate::tenants::{self, Plan, TenantConfig};
use crate::AppState;

use super::crud::{LoginAttemptCrud, PrincipalCrud, SessionCrud};
use super::error::AuthError;
use super::guard::{AuthPrincipal, CoachPrincipal};
use super::model::{Principal, Role};
use super::schema::{
    ChangePasswordRequest, ChangePinRequest, ClubResponse, ClubSnapshot, Disable2faRequest,
    ForgotPasswordRequest, LoginCredentials, LoginRequest, LoginResponse, LogoutRequest,
    MessageResponse, RefreshRequest, RegisterRequest, Requires2faResponse, ResetPasswordRequest,
    ResetPinAction, ResetPinBody, ResetPinParams, ResetPinValidateResponse, Setup2faResponse,
    SignupRequest, SignupResponse, SuccessResponse, TokenPairResponse, UpdateProfileRequest,
    Verify2faRequest, Verify2faResponse, VerifyEmailRequest,
};

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

const REGISTER_GENERIC_MESSAGE: &str =
    "If an account does not already exist for this email, it has been created. Check your inbox to verify your email address.";
const FORGOT_PASSWORD_GENERIC_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent.";
const PIN_RESET_GENERIC_MESSAGE: &str =
    "If the account exists, a PIN reset link has been sent.";

// =============================================================================
// Helpers
// =============================================================================

/// First X-Forwarded-For entry, or "unknown" when the transport gives us
/// nothing to key on.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn validate_new_password(state: &AppState, password: &str) -> Result<(), AuthError> {
    crate::services::password_policy::validate_password_strength(password)
        .map_err(AuthError::password_problems)?;

    let breaches = state.breach.breach_count(password).await;
    if breaches > 0 {
        return Err(AuthError::validation(
            "password",
            format!("This password has appeared in {breaches} known data breaches. Choose another one."),
        ));
    }
    Ok(())
}

fn validate_new_pin(pin: &str) -> Result<(), AuthError> {
    crate::services::password_policy::validate_pin_format(pin)
        .map_err(|msg| AuthError::validation("pin", msg))
}

fn auth_cookie(name: &str, value: &str, max_age_secs: i64, env: AppEnv) -> HeaderValue {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}");
    if env == AppEnv::Production {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).expect("cookie value is ascii")
}

/// In cookie mode the tokens ride in HttpOnly cookies and are omitted from
/// the JSON body.
fn token_headers(state: &AppState, access_token: &str, refresh_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if state.settings.use_httponly_cookies {
        headers.append(
            header::SET_COOKIE,
            auth_cookie(
                "accessToken",
                access_token,
                state.jwt.access_token_duration_secs(),
                state.settings.app_env,
            ),
        );
        headers.append(
            header::SET_COOKIE,
            auth_cookie(
                "refreshToken",
                refresh_token,
                SessionCrud::session_ttl().num_seconds(),
                state.settings.app_env,
            ),
        );
    }
    headers
}

fn body_tokens(state: &AppState, token: String) -> Option<String> {
    if state.settings.use_httponly_cookies {
        None
    } else {
        Some(token)
    }
}

fn new_admin_principal(
    tenant_id: &str,
    email: &str,
    password_hash: String,
    verification_token: &str,
    now: DateTime<Utc>,
) -> Principal {
    Principal {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        role: Role::Admin.as_str().to_string(),
        email: email.to_string(),
        username: None,
        password_hash: Some(password_hash),
        pin_hash: None,
        email_verified: false,
        email_verification_token: Some(verification_token.to_string()),
        email_verification_expires: Some(now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)),
        password_reset_token: None,
        password_reset_expires: None,
        pin_reset_token: None,
        pin_reset_expires: None,
        two_factor_enabled: false,
        two_factor_secret: None,
        two_factor_backup_codes: None,
        created_at: now,
        updated_at: now,
        last_login: None,
    }
}

// =============================================================================
// Signup & register
// =============================================================================

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AuthError> {
    req.validate()?;

    let plan = match req.plan_id.as_deref() {
        None => None,
        Some(raw) => match Plan::parse(raw) {
            Some(plan @ (Plan::Basic | Plan::Professional)) => Some(plan),
            _ => {
                return Err(AuthError::validation(
                    "planId",
                    "Plan must be \"basic\" or \"professional\"",
                ))
            }
        },
    };

    validate_new_password(&state, &req.password).await?;

    let subdomain = tenants::name_to_subdomain(&req.club_name);
    tenants::validate_subdomain(&subdomain)
        .map_err(|msg| AuthError::validation("clubName", msg))?;

    if !state.tenants.is_available(&subdomain).await? {
        return Err(AuthError::SubdomainTaken);
    }

    let principals = PrincipalCrud::new(state.db.clone());
    if principals.email_exists_anywhere(&req.email).await? {
        return Err(AuthError::EmailTaken);
    }

    state
        .tenants
        .create(&TenantConfig::provision(&req.club_name, &subdomain, plan))
        .await?;

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let verification_token = hashing::generate_token();
    let principal = new_admin_principal(&subdomain, &req.email, password_hash, &verification_token, now);
    principals.create(&principal).await?;

    // Best-effort side effects; signup itself has already succeeded.
    let email_service = state.email.clone();
    let to = req.email.clone();
    let tenant_id = subdomain.clone();
    tokio::spawn(async move {
        if let Err(err) = email_service
            .send_verification(&tenant_id, &to, &verification_token)
            .await
        {
            tracing::warn!(error = %err, "failed to send signup verification email");
        }
        email_service.notify_signup(&to, &tenant_id).await;
    });

    tracing::info!(tenant = %subdomain, "tenant provisioned");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            club: ClubSnapshot::from(&principal),
        }),
    ))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    req.validate()?;
    validate_new_password(&state, &req.password).await?;

    let generic = || {
        (
            StatusCode::CREATED,
            Json(MessageResponse {
                success: true,
                message: REGISTER_GENERIC_MESSAGE.to_string(),
            }),
        )
    };

    let principals = PrincipalCrud::new(state.db.clone());
    if principals
        .email_exists_in_tenant(&req.tenant_id, &req.email)
        .await?
    {
        // Same response as a fresh registration; existence is not disclosed.
        return Ok(generic());
    }

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

    let now = Utc::now();
    let verification_token = hashing::generate_token();
    let principal =
        new_admin_principal(&req.tenant_id, &req.email, password_hash, &verification_token, now);
    principals.create(&principal).await?;

    let email_service = state.email.clone();
    let to = req.email.clone();
    let tenant_id = req.tenant_id.clone();
    tokio::spawn(async move {
        if let Err(err) = email_service
            .send_verification(&tenant_id, &to, &verification_token)
            .await
        {
            tracing::warn!(error = %err, "failed to send registration verification email");
        }
    });

    Ok(generic())
}

// =============================================================================
// Login
// =============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    req.validate()?;

    let Some(credentials) = req.credentials() else {
        return Err(AuthError::validation(
            "credentials",
            "Either email and password or username and pin must be provided",
        ));
    };

    let identifier = match &credentials {
        LoginCredentials::EmailPassword { email, .. } => email.to_string(),
        LoginCredentials::UsernamePin { username, .. } => username.to_lowercase(),
    };
    let ip = client_ip(&headers);
    let now = Utc::now();

    let attempts = LoginAttemptCrud::new(state.db.clone());
    if let Some(lockout_until) = attempts.lockout_until(&identifier, &ip, now).await? {
        state
            .metrics
            .login_attempts_total
            .with_label_values(&[&req.tenant_id, "locked_out"])
            .inc();
        return Err(AuthError::RateLimited { lockout_until });
    }

    let principals = PrincipalCrud::new(state.db.clone());

    // Both arms produce the same error for "no such user" and "wrong secret".
    let principal = match &credentials {
        LoginCredentials::EmailPassword { email, password } => {
            let found = principals.find_admin_by_email(&req.tenant_id, email).await?;
            let Some(principal) = found else {
                attempts.record(&identifier, &ip, None, false, now).await?;
                return Err(AuthError::InvalidEmailCredentials);
            };
            let stored = principal.password_hash.as_deref().unwrap_or_default();
            if !hashing::verify_secret(password, stored) {
                attempts
                    .record(&identifier, &ip, Some(&principal.id), false, now)
                    .await?;
                state
                    .metrics
                    .login_attempts_total
                    .with_label_values(&[&req.tenant_id, "failure"])
                    .inc();
                return Err(AuthError::InvalidEmailCredentials);
            }
            if !principal.email_verified {
                return Err(AuthError::EmailNotVerified);
            }
            principal
        }
        LoginCredentials::UsernamePin { username, pin } => {
            let found = principals
                .find_coach_by_username(&req.tenant_id, username)
                .await?;
            let Some(principal) = found else {
                attempts.record(&identifier, &ip, None, false, now).await?;
                return Err(AuthError::InvalidPinCredentials);
            };
            let stored = principal.pin_hash.as_deref().unwrap_or_default();
            if !hashing::verify_secret(pin, stored) {
                attempts
                    .record(&identifier, &ip, Some(&principal.id), false, now)
                    .await?;
                state
                    .metrics
                    .login_attempts_total
                    .with_label_values(&[&req.tenant_id, "failure"])
                    .inc();
                return Err(AuthError::InvalidPinCredentials);
            }
            principal
        }
    };

    if principal.two_factor_enabled {
        let passed = verify_second_factor(&state, &principal, &req, now).await?;
        if !passed.verified {
            if passed.challenge {
                // Credentials are good; the client must come back with a code.
                return Ok(Json(Requires2faResponse { requires_2fa: true }).into_response());
            }
            attempts
                .record(&identifier, &ip, Some(&principal.id), false, now)
                .await?;
            state
                .metrics
                .login_attempts_total
                .with_label_values(&[&req.tenant_id, "failure"])
                .inc();
            return Err(AuthError::InvalidTwoFactorCode);
        }
    }

    let access_token = state
        .jwt
        .mint_access_token(
            &principal.id,
            &principal.tenant_id,
            principal.role(),
            &principal.email,
        )
        .map_err(|e| AuthError::Internal(format!("token minting failed: {e}")))?;

    let refresh_token = hashing::generate_token();
    SessionCrud::new(state.db.clone())
        .create(&principal.id, &hashing::hash_refresh_token(&refresh_token), now)
        .await?;

    principals.touch_last_login(&principal.id, now).await?;
    attempts
        .record(&identifier, &ip, Some(&principal.id), true, now)
        .await?;
    state
        .metrics
        .login_attempts_total
        .with_label_values(&[&req.tenant_id, "success"])
        .inc();

    let headers = token_headers(&state, &access_token, &refresh_token);
    let body = LoginResponse {
        success: true,
        access_token: body_tokens(&state, access_token),
        refresh_token: body_tokens(&state, refresh_token),
        club: ClubSnapshot::from(&principal),
    };

    Ok((headers, Json(body)).into_response())
}

struct SecondFactorOutcome {
    verified: bool,
    /// True when no code was offered at all: answer with a 2FA challenge.
    challenge: bool,
}

async fn verify_second_factor(
    state: &AppState,
    principal: &Principal,
    req: &LoginRequest,
    now: DateTime<Utc>,
) -> Result<SecondFactorOutcome, AuthError> {
    let secret = principal.two_factor_secret.as_deref().unwrap_or_default();

    if let Some(code) = req.totp_code.as_deref() {
        return Ok(SecondFactorOutcome {
            verified: totp::verify_code(secret, code),
            challenge: false,
        });
    }

    if let Some(backup_code) = req.backup_code.as_deref() {
        let mut hashes = principal.backup_code_hashes();
        let matched = hashes
            .iter()
            .position(|hash| hashing::verify_secret(backup_code, hash));
        if let Some(index) = matched {
            // Each backup code is consumable exactly once.
            hashes.remove(index);
            let json = serde_json::to_string(&hashes)
                .map_err(|e| AuthError::Internal(format!("backup code encoding failed: {e}")))?;
            PrincipalCrud::new(state.db.clone())
                .set_backup_codes(&principal.id, &json, now)
                .await?;
            return Ok(SecondFactorOutcome {
                verified: true,
                challenge: false,
            });
        }
        return Ok(SecondFactorOutcome {
            verified: false,
            challenge: false,
        });
    }

    Ok(SecondFactorOutcome {
        verified: false,
        challenge: true,
    })
}

// =============================================================================
// Refresh & logout
// =============================================================================

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Response, AuthError> {
    req.validate()?;
    let now = Utc::now();

    let old_hash = hashing::hash_refresh_token(&req.refresh_token);
    let new_refresh_token = hashing::generate_token();
    let new_hash = hashing::hash_refresh_token(&new_refresh_token);

    let rotated = SessionCrud::new(state.db.clone())
        .rotate(&old_hash, &new_hash, now)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

    let principal = PrincipalCrud::new(state.db.clone())
        .find_by_id(&rotated.principal_id)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

    let access_token = state
        .jwt
        .mint_access_token(
            &principal.id,
            &principal.tenant_id,
            principal.role(),
            &principal.email,
        )
        .map_err(|e| AuthError::Internal(format!("token minting failed: {e}")))?;

    let headers = token_headers(&state, &access_token, &new_refresh_token);
    let body = TokenPairResponse {
        success: true,
        access_token: body_tokens(&state, access_token),
        refresh_token: body_tokens(&state, new_refresh_token),
    };

    Ok((headers, Json(body)).into_response())
}

/// Idempotent: logging out an unknown token is still a success.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;
    SessionCrud::new(state.db.clone())
        .delete_by_hash(&hashing::hash_refresh_token(&req.refresh_token))
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Email verification
// =============================================================================

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;
    let now = Utc::now();

    let principals = PrincipalCrud::new(state.db.clone());
    let principal = principals
        .find_by_verification_token(&req.token, now)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    principals.mark_email_verified(&principal.id, now).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Password reset
// =============================================================================

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    req.validate()?;
    let now = Utc::now();

    let principals = PrincipalCrud::new(state.db.clone());
    if let Some(principal) = principals
        .find_admin_by_email(&req.tenant_id, &req.email)
        .await?
    {
        let token = hashing::generate_token();
        principals
            .set_password_reset_token(
                &principal.id,
                &token,
                now + Duration::hours(RESET_TOKEN_TTL_HOURS),
                now,
            )
            .await?;
        // Dispatch failures stay invisible so the response shape never
        // depends on whether the account exists.
        if let Err(err) = state
            .email
            .send_password_reset(&principal.tenant_id, &principal.email, &token)
            .await
        {
            tracing::warn!(error = %err, "failed to send password reset email");
        }
    }

    Ok(Json(MessageResponse {
        success: true,
        message: FORGOT_PASSWORD_GENERIC_MESSAGE.to_string(),
    }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;
    let now = Utc::now();

    let principals = PrincipalCrud::new(state.db.clone());
    let principal = principals
        .find_by_password_reset_token(&req.token, now)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    validate_new_password(&state, &req.password).await?;

    let password_hash = hashing::hash_password(&req.password)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;
    principals
        .update_password(&principal.id, &password_hash, now)
        .await?;

    SessionCrud::new(state.db.clone())
        .delete_for_principal(&principal.id)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Credential change (authenticated)
// =============================================================================

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthPrincipal,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;

    if auth.role == Role::Coach {
        return Err(AuthError::Forbidden);
    }

    let stored = auth.principal.password_hash.as_deref().unwrap_or_default();
    if !hashing::verify_secret(&req.current_password, stored) {
        return Err(AuthError::IncorrectCurrentPassword);
    }

    validate_new_password(&state, &req.new_password).await?;

    let now = Utc::now();
    let password_hash = hashing::hash_password(&req.new_password)
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;
    PrincipalCrud::new(state.db.clone())
        .update_password(&auth.club_id, &password_hash, now)
        .await?;

    // Every session dies with the old credential.
    SessionCrud::new(state.db.clone())
        .delete_for_principal(&auth.club_id)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn change_pin(
    State(state): State<Arc<AppState>>,
    coach: CoachPrincipal,
    Json(req): Json<ChangePinRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;
    let auth = coach.0;

    let stored = auth.principal.pin_hash.as_deref().unwrap_or_default();
    if !hashing::verify_secret(&req.current_pin, stored) {
        return Err(AuthError::IncorrectCurrentPin);
    }

    validate_new_pin(&req.new_pin)?;

    let now = Utc::now();
    let pin_hash = hashing::hash_pin(&req.new_pin)
        .map_err(|e| AuthError::Internal(format!("PIN hashing failed: {e}")))?;
    PrincipalCrud::new(state.db.clone())
        .update_pin(&auth.club_id, &pin_hash, now)
        .await?;

    SessionCrud::new(state.db.clone())
        .delete_for_principal(&auth.club_id)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// PIN reset (three-phase)
// =============================================================================

pub async fn reset_pin(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetPinParams>,
    Json(req): Json<ResetPinBody>,
) -> Result<Response, AuthError> {
    match params.action {
        ResetPinAction::Request => request_pin_reset(&state, &req).await,
        ResetPinAction::Validate => validate_pin_reset(&state, &req).await,
        ResetPinAction::Reset => perform_pin_reset(&state, &req).await,
    }
}

async fn request_pin_reset(state: &AppState, req: &ResetPinBody) -> Result<Response, AuthError> {
    let (Some(email), Some(username), Some(tenant_id)) = (
        req.email.as_deref(),
        req.username.as_deref(),
        req.tenant_id.as_deref(),
    ) else {
        return Err(AuthError::validation(
            "body",
            "email, username and tenantId are required",
        ));
    };

    let now = Utc::now();
    let principals = PrincipalCrud::new(state.db.clone());
    if let Some(principal) = principals
        .find_coach_for_pin_reset(tenant_id, email, username)
        .await?
    {
        let token = hashing::generate_token();
        principals
            .set_pin_reset_token(
                &principal.id,
                &token,
                now + Duration::hours(RESET_TOKEN_TTL_HOURS),
                now,
            )
            .await?;

        // Deliberate policy trade-off: a delivery failure here is surfaced
        // as a 500 so operators notice transport breakage, even though that
        // leaks account existence on this one endpoint.
        let username_display = principal.username.as_deref().unwrap_or(username);
        state
            .email
            .send_pin_reset(&principal.tenant_id, &principal.email, username_display, &token)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "PIN reset email failed");
                AuthError::EmailDelivery
            })?;
    }

    Ok(Json(MessageResponse {
        success: true,
        message: PIN_RESET_GENERIC_MESSAGE.to_string(),
    })
    .into_response())
}

/// Resolves a token to the coach's username without consuming anything, so
/// the reset UI can greet the user.
async fn validate_pin_reset(state: &AppState, req: &ResetPinBody) -> Result<Response, AuthError> {
    let token = req
        .token
        .as_deref()
        .ok_or_else(|| AuthError::validation("token", "Token is required"))?;

    let principal = PrincipalCrud::new(state.db.clone())
        .find_by_pin_reset_token(token, Utc::now())
        .await?
        .ok_or(AuthError::InvalidToken)?;

    Ok(Json(ResetPinValidateResponse {
        success: true,
        username: principal.username.unwrap_or_default(),
    })
    .into_response())
}

async fn perform_pin_reset(state: &AppState, req: &ResetPinBody) -> Result<Response, AuthError> {
    let token = req
        .token
        .as_deref()
        .ok_or_else(|| AuthError::validation("token", "Token is required"))?;
    let pin = req
        .pin
        .as_deref()
        .ok_or_else(|| AuthError::validation("pin", "PIN is required"))?;

    let now = Utc::now();
    let principals = PrincipalCrud::new(state.db.clone());
    let principal = principals
        .find_by_pin_reset_token(token, now)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    validate_new_pin(pin)?;

    let pin_hash = hashing::hash_pin(pin)
        .map_err(|e| AuthError::Internal(format!("PIN hashing failed: {e}")))?;
    principals.update_pin(&principal.id, &pin_hash, now).await?;

    SessionCrud::new(state.db.clone())
        .delete_for_principal(&principal.id)
        .await?;

    Ok(Json(SuccessResponse { success: true }).into_response())
}

// =============================================================================
// Two-factor
// =============================================================================

pub async fn setup_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthPrincipal,
) -> Result<Json<Setup2faResponse>, AuthError> {
    if auth.principal.two_factor_enabled {
        return Err(AuthError::TwoFactorAlreadyEnabled);
    }

    let secret = totp::generate_secret()
        .map_err(|e| AuthError::Internal(format!("TOTP secret generation failed: {e}")))?;
    let qr_code = totp::qr_code_data_uri(&secret, &auth.email)
        .map_err(|e| AuthError::Internal(format!("QR rendering failed: {e}")))?;

    // Enrolment is pending until the first code verifies.
    PrincipalCrud::new(state.db.clone())
        .set_two_factor_secret(&auth.club_id, &secret, Utc::now())
        .await?;

    Ok(Json(Setup2faResponse { secret, qr_code }))
}

pub async fn verify_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthPrincipal,
    Json(req): Json<Verify2faRequest>,
) -> Result<Json<Verify2faResponse>, AuthError> {
    req.validate()?;

    let secret = auth
        .principal
        .two_factor_secret
        .as_deref()
        .ok_or(AuthError::TwoFactorNotEnabled)?;

    if !totp::verify_code(secret, &req.code) {
        return Err(AuthError::InvalidTwoFactorCode);
    }

    let backup_codes = totp::generate_backup_codes();
    let hashes = totp::hash_backup_codes(&backup_codes)
        .map_err(|e| AuthError::Internal(format!("backup code hashing failed: {e}")))?;
    let json = serde_json::to_string(&hashes)
        .map_err(|e| AuthError::Internal(format!("backup code encoding failed: {e}")))?;

    PrincipalCrud::new(state.db.clone())
        .enable_two_factor(&auth.club_id, &json, Utc::now())
        .await?;

    if let Err(err) = state.email.send_two_factor_enabled(&auth.email).await {
        tracing::warn!(error = %err, "failed to send 2FA-enabled notification");
    }

    // The plaintext codes exist only in this response.
    Ok(Json(Verify2faResponse {
        success: true,
        backup_codes,
    }))
}

pub async fn disable_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthPrincipal,
    Json(req): Json<Disable2faRequest>,
) -> Result<Json<SuccessResponse>, AuthError> {
    req.validate()?;

    if !auth.principal.two_factor_enabled {
        return Err(AuthError::TwoFactorNotEnabled);
    }

    let stored = auth.principal.password_hash.as_deref().unwrap_or_default();
    if !hashing::verify_secret(&req.password, stored) {
        return Err(AuthError::IncorrectCurrentPassword);
    }

    PrincipalCrud::new(state.db.clone())
        .disable_two_factor(&auth.club_id, Utc::now())
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Profile
// =============================================================================

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthPrincipal,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ClubResponse>, AuthError> {
    req.validate()?;
    let principals = PrincipalCrud::new(state.db.clone());

    if let Some(email) = req.email.as_deref().filter(|e| *e != auth.email) {
        if principals
            .email_exists_in_tenant(&auth.tenant_id, email)
            .await?
        {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let token = hashing::generate_token();
        principals
            .change_email(
                &auth.club_id,
                email,
                &token,
                now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS),
                now,
            )
            .await?;

        if let Err(err) = state
            .email
            .send_verification(&auth.tenant_id, email, &token)
            .await
        {
            tracing::warn!(error = %err, "failed to send re-verification email");
        }
    }

    let principal = principals
        .find_by_id(&auth.club_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    Ok(Json(ClubResponse {
        success: true,
        club: ClubSnapshot::from(&principal),
    }))
}

pub async fn whoami(auth: AuthPrincipal) -> Json<ClubResponse> {
    Json(ClubResponse {
        success: true,
        club: ClubSnapshot::from(&auth.principal),
    })
}
