use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

/// Tenant-scoped coach administration. The tenant in the path must match the
/// caller's tenant unless the caller is a super-admin.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/{tenant_id}/admin/coaches",
            get(controller::list_coaches).post(controller::create_coach),
        )
        .route(
            "/{tenant_id}/admin/coaches/{coach_id}",
            delete(controller::delete_coach)
                .get(controller::get_coach)
                .put(controller::update_coach)
                .post(controller::coach_action),
        )
}
