use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::modules::auth::crud::{CoachPatch, PrincipalCrud, SessionCrud};
use crate::modules::auth::error::AuthError;
use crate::modules::auth::guard::AdminPrincipal;
use crate::modules::auth::model::{Principal, Role};
use crate::modules::auth::schema::{ClubSnapshot, MessageResponse, SuccessResponse};
use crate::services::email::Delivery;
use crate::services::{hashing, password_policy};
use crate::AppState;

use super::schema::{
    CoachActionRequest, CoachListResponse, CoachResponse, CreateCoachRequest, CreateCoachResponse,
    UpdateCoachRequest,
};

const PIN_RESET_TOKEN_TTL_HOURS: i64 = 1;

pub async fn list_coaches(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path(tenant_id): Path<String>,
) -> Result<Json<CoachListResponse>, AuthError> {
    admin.0.require_tenant(&tenant_id)?;

    let coaches = PrincipalCrud::new(state.db.clone())
        .list_coaches(&tenant_id)
        .await?;

    Ok(Json(CoachListResponse {
        success: true,
        coaches: coaches.iter().map(ClubSnapshot::from).collect(),
    }))
}

pub async fn create_coach(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreateCoachRequest>,
) -> Result<(StatusCode, Json<CreateCoachResponse>), AuthError> {
    admin.0.require_tenant(&tenant_id)?;
    req.validate()?;

    // Canonical form is lowercase; the unique index backs this up.
    let username = req.username.to_lowercase();

    let principals = PrincipalCrud::new(state.db.clone());
    if principals.username_exists(&tenant_id, &username).await? {
        return Err(AuthError::UsernameTaken);
    }
    if principals
        .email_exists_in_tenant(&tenant_id, &req.email)
        .await?
    {
        return Err(AuthError::EmailTaken);
    }

    let tenant = state.tenants.get(&tenant_id).await?;
    let plan = tenant
        .as_ref()
        .map(|cfg| cfg.plan())
        .unwrap_or(crate::tenants::Plan::Basic);
    if let Some(limit) = plan.coach_limit() {
        let count = principals.count_coaches(&tenant_id).await?;
        if count >= i64::from(limit) {
            return Err(AuthError::PlanLimitReached);
        }
    }

    let pin = match req.pin.as_deref() {
        Some(pin) => {
            password_policy::validate_pin_format(pin)
                .map_err(|msg| AuthError::validation("pin", msg))?;
            pin.to_string()
        }
        None => hashing::generate_pin(),
    };

    let pin_hash = hashing::hash_pin(&pin)
        .map_err(|e| AuthError::Internal(format!("PIN hashing failed: {e}")))?;

    let now = Utc::now();
    let principal = new_coach_principal(&tenant_id, &req.email, &username, pin_hash, now);
    principals.create(&principal).await?;

    let send_email = req.send_email.unwrap_or(false);
    if send_email {
        let club_name = tenant
            .map(|cfg| cfg.name)
            .unwrap_or_else(|| tenant_id.clone());
        // Welcome-email failure never rolls back the coach; it is logged and
        // the admin can trigger a PIN reset instead.
        if let Err(err) = state
            .email
            .send_coach_welcome(&tenant_id, &req.email, &club_name, &username, &pin)
            .await
        {
            tracing::warn!(error = %err, "failed to send coach welcome email");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(CreateCoachResponse {
            success: true,
            coach: ClubSnapshot::from(&principal),
            // Disclosed exactly once, and only when no welcome email carries it.
            pin: (!send_email).then_some(pin),
        }),
    ))
}

pub async fn get_coach(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path((tenant_id, coach_id)): Path<(String, String)>,
) -> Result<Json<CoachResponse>, AuthError> {
    admin.0.require_tenant(&tenant_id)?;

    let coach = PrincipalCrud::new(state.db.clone())
        .find_coach_by_id(&tenant_id, &coach_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    Ok(Json(CoachResponse {
        success: true,
        coach: ClubSnapshot::from(&coach),
    }))
}

pub async fn update_coach(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path((tenant_id, coach_id)): Path<(String, String)>,
    Json(req): Json<UpdateCoachRequest>,
) -> Result<Json<CoachResponse>, AuthError> {
    admin.0.require_tenant(&tenant_id)?;
    req.validate()?;

    let principals = PrincipalCrud::new(state.db.clone());
    let existing = principals
        .find_coach_by_id(&tenant_id, &coach_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    let mut patch = CoachPatch::default();

    if let Some(email) = req.email.as_deref().filter(|e| *e != existing.email) {
        if principals.email_exists_in_tenant(&tenant_id, email).await? {
            return Err(AuthError::EmailTaken);
        }
        patch.email = Some(email.to_string());
    }

    if let Some(username) = req.username.as_deref() {
        let username = username.to_lowercase();
        let current = existing.username.as_deref().unwrap_or_default();
        if username != current.to_lowercase() {
            if principals.username_exists(&tenant_id, &username).await? {
                return Err(AuthError::UsernameTaken);
            }
            patch.username = Some(username);
        }
    }

    let pin_changed = if let Some(pin) = req.pin.as_deref() {
        password_policy::validate_pin_format(pin)
            .map_err(|msg| AuthError::validation("pin", msg))?;
        patch.pin_hash = Some(
            hashing::hash_pin(pin)
                .map_err(|e| AuthError::Internal(format!("PIN hashing failed: {e}")))?,
        );
        true
    } else {
        false
    };

    if !patch.is_empty() {
        let updated = principals
            .update_coach(&tenant_id, &coach_id, &patch, Utc::now())
            .await?;
        if updated == 0 {
            return Err(AuthError::NotFound);
        }
    }

    if pin_changed {
        // A new credential terminates every session, same as self-service.
        SessionCrud::new(state.db.clone())
            .delete_for_principal(&coach_id)
            .await?;
    }

    let coach = principals
        .find_coach_by_id(&tenant_id, &coach_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    Ok(Json(CoachResponse {
        success: true,
        coach: ClubSnapshot::from(&coach),
    }))
}

pub async fn delete_coach(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path((tenant_id, coach_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AuthError> {
    admin.0.require_tenant(&tenant_id)?;

    let deleted = PrincipalCrud::new(state.db.clone())
        .delete_coach(&tenant_id, &coach_id)
        .await?;
    if deleted == 0 {
        return Err(AuthError::NotFound);
    }

    SessionCrud::new(state.db.clone())
        .delete_for_principal(&coach_id)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST on a coach resource carries an action verb; `reset-pin` is the only
/// one today.
pub async fn coach_action(
    State(state): State<Arc<AppState>>,
    admin: AdminPrincipal,
    Path((tenant_id, coach_id)): Path<(String, String)>,
    Json(req): Json<CoachActionRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    admin.0.require_tenant(&tenant_id)?;

    if req.action != "reset-pin" {
        return Err(AuthError::validation("action", "Unknown action"));
    }

    let principals = PrincipalCrud::new(state.db.clone());
    let coach = principals
        .find_coach_by_id(&tenant_id, &coach_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    let now = Utc::now();
    let token = hashing::generate_token();
    principals
        .set_pin_reset_token(
            &coach.id,
            &token,
            now + Duration::hours(PIN_RESET_TOKEN_TTL_HOURS),
            now,
        )
        .await?;

    // The admin asked for an email to go out; "not configured" is a failure
    // here, not a silent success.
    let username = coach.username.as_deref().unwrap_or_default();
    match state
        .email
        .send_pin_reset(&tenant_id, &coach.email, username, &token)
        .await
    {
        Ok(Delivery::Sent) => {}
        Ok(Delivery::Skipped) => return Err(AuthError::EmailDelivery),
        Err(err) => {
            tracing::error!(error = %err, "admin PIN reset email failed");
            return Err(AuthError::EmailDelivery);
        }
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "PIN reset email sent".to_string(),
    }))
}

fn new_coach_principal(
    tenant_id: &str,
    email: &str,
    username: &str,
    pin_hash: String,
    now: DateTime<Utc>,
) -> Principal {
    Principal {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        role: Role::Coach.as_str().to_string(),
        email: email.to_string(),
        username: Some(username.to_string()),
        password_hash: None,
        pin_hash: Some(pin_hash),
        // Coaches are provisioned by an admin; no verification round-trip.
        email_verified: true,
        email_verification_token: None,
        email_verification_expires: None,
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
