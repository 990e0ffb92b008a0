use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn change_password_invalidates_every_session() {
    let ctx = TestContext::new().await;
    let admin_id = ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;
    let (access, refresh) = ctx.login_admin("foo-bar", "a@b.dk", test_password()).await;
    // A second device.
    ctx.login_admin("foo-bar", "a@b.dk", test_password()).await;
    assert_eq!(ctx.session_count(&admin_id).await, 2);

    ctx.server
        .post("/auth/change-password")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPassword": test_password(),
            "newPassword": "NewPassw0rd!"
        }))
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.session_count(&admin_id).await, 0);

    // The refresh token issued before the change is dead.
    ctx.server
        .post("/auth/refresh")
        .json(&json!({ "refreshToken": refresh }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // The new password logs in.
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": "NewPassw0rd!"
        }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn change_password_rejects_wrong_current_password() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;
    let (access, _) = ctx.login_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/change-password")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPassword": "WrongPassword1!",
            "newPassword": "NewPassw0rd!"
        }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_is_forbidden_for_coaches() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, _) = ctx.login_coach("foo-bar", "john", "314159").await;

    ctx.server
        .post("/auth/change-password")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPassword": "314159",
            "newPassword": "NewPassw0rd!"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn change_password_requires_a_bearer_token() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/auth/change-password")
        .json(&json!({
            "currentPassword": test_password(),
            "newPassword": "NewPassw0rd!"
        }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_pin_invalidates_sessions_and_old_refresh_token() {
    let ctx = TestContext::new().await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, refresh) = ctx.login_coach("foo-bar", "john", "314159").await;
    assert_eq!(ctx.session_count(&coach_id).await, 1);

    ctx.server
        .post("/auth/change-pin")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPIN": "314159",
            "newPIN": "271828"
        }))
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.session_count(&coach_id).await, 0);
    ctx.server
        .post("/auth/refresh")
        .json(&json!({ "refreshToken": refresh }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    ctx.server
        .post("/auth/login")
        .json(&json!({ "tenantId": "foo-bar", "username": "john", "pin": "271828" }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn change_pin_rejects_wrong_current_pin() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, _) = ctx.login_coach("foo-bar", "john", "314159").await;

    ctx.server
        .post("/auth/change-pin")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPIN": "000000",
            "newPIN": "271828"
        }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_pin_enforces_the_six_digit_format() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, _) = ctx.login_coach("foo-bar", "john", "314159").await;

    ctx.server
        .post("/auth/change-pin")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPIN": "314159",
            "newPIN": "12ab56"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_pin_is_forbidden_for_admins() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;
    let (access, _) = ctx.login_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/change-pin")
        .authorization_bearer(&access)
        .json(&json!({
            "currentPIN": "314159",
            "newPIN": "271828"
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
