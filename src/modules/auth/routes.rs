use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(controller::signup))
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/refresh", post(controller::refresh))
        .route("/logout", post(controller::logout))
        .route("/verify-email", post(controller::verify_email))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/reset-password", post(controller::reset_password))
        .route("/change-password", post(controller::change_password))
        .route("/change-pin", post(controller::change_pin))
        .route("/reset-pin", post(controller::reset_pin))
        .route("/setup-2fa", post(controller::setup_2fa))
        .route("/verify-2fa", post(controller::verify_2fa))
        .route("/disable-2fa", post(controller::disable_2fa))
        .route("/update-profile", put(controller::update_profile))
        .route("/club", get(controller::whoami))
}
