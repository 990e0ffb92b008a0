//! Bearer-token guards. The access token gets the request to the door; the
//! principal row decides what it may do. The role claim inside the token is
//! never trusted on its own, so a role change takes effect before the token
//! expires.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::AppState;

use super::crud::PrincipalCrud;
use super::error::AuthError;
use super::model::{Principal, Role};

/// An authenticated principal, rehydrated from the datastore.
pub struct AuthPrincipal {
    pub club_id: String,
    pub tenant_id: String,
    pub role: Role,
    pub email: String,
    pub principal: Principal,
}

impl AuthPrincipal {
    /// Tenant-scope check for path-addressed resources. Super-admins may
    /// cross tenants.
    pub fn require_tenant(&self, tenant_id: &str) -> Result<(), AuthError> {
        if self.role == Role::SuperAdmin || self.tenant_id == tenant_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<Arc<AppState>> for AuthPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::Unauthorized)?;
        let claims = state
            .jwt
            .verify_access_token(token)
            .ok_or(AuthError::Unauthorized)?;

        let principal = PrincipalCrud::new(state.db.clone())
            .find_by_id_in_tenant(&claims.club_id, &claims.tenant_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        Ok(AuthPrincipal {
            club_id: principal.id.clone(),
            tenant_id: principal.tenant_id.clone(),
            // The row's role wins over the claim's.
            role: principal.role(),
            email: principal.email.clone(),
            principal,
        })
    }
}

/// Admin or super-admin.
pub struct AdminPrincipal(pub AuthPrincipal);

impl FromRequestParts<Arc<AppState>> for AdminPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthPrincipal::from_request_parts(parts, state).await?;
        if !auth.role.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminPrincipal(auth))
    }
}

pub struct SuperAdminPrincipal(pub AuthPrincipal);

impl FromRequestParts<Arc<AppState>> for SuperAdminPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthPrincipal::from_request_parts(parts, state).await?;
        if auth.role != Role::SuperAdmin {
            return Err(AuthError::Forbidden);
        }
        Ok(SuperAdminPrincipal(auth))
    }
}

pub struct CoachPrincipal(pub AuthPrincipal);

impl FromRequestParts<Arc<AppState>> for CoachPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthPrincipal::from_request_parts(parts, state).await?;
        if auth.role != Role::Coach {
            return Err(AuthError::Forbidden);
        }
        Ok(CoachPrincipal(auth))
    }
}
