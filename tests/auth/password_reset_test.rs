use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_password, TestContext};

async fn reset_token_for(ctx: &TestContext, email: &str) -> Option<String> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT password_reset_token FROM principals WHERE email = ?")
            .bind(email)
            .fetch_optional(&ctx.db)
            .await
            .unwrap();
    row.and_then(|(token,)| token)
}

#[tokio::test]
async fn forgot_password_is_enumeration_resistant() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    let known = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    known.assert_status(StatusCode::OK);
    let known_body: serde_json::Value = known.json();

    let unknown = ctx
        .server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "ghost@b.dk", "tenantId": "foo-bar" }))
        .await;
    unknown.assert_status(StatusCode::OK);
    let unknown_body: serde_json::Value = unknown.json();

    assert_eq!(known_body["message"], unknown_body["message"]);

    // Only the real account received a token.
    assert!(reset_token_for(&ctx, "a@b.dk").await.is_some());
    assert!(reset_token_for(&ctx, "ghost@b.dk").await.is_none());
}

#[tokio::test]
async fn reset_password_rotates_credential_and_kills_sessions() {
    let ctx = TestContext::new().await;
    let admin_id = ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;
    ctx.login_admin("foo-bar", "a@b.dk", test_password()).await;
    assert_eq!(ctx.session_count(&admin_id).await, 1);

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let token = reset_token_for(&ctx, "a@b.dk").await.unwrap();

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": &token, "password": "NewPassw0rd!" }))
        .await
        .assert_status(StatusCode::OK);

    // All sessions are gone and the token is consumed.
    assert_eq!(ctx.session_count(&admin_id).await, 0);
    assert!(reset_token_for(&ctx, "a@b.dk").await.is_none());

    // Old password dead, new password live.
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": test_password()
        }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
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
async fn reset_token_is_single_use() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let token = reset_token_for(&ctx, "a@b.dk").await.unwrap();

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": &token, "password": "NewPassw0rd!" }))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": token, "password": "OtherPassw0rd!" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_reset_token_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let token = reset_token_for(&ctx, "a@b.dk").await.unwrap();

    sqlx::query("UPDATE principals SET password_reset_expires = ? WHERE email = 'a@b.dk'")
        .bind(chrono::Utc::now() - chrono::Duration::minutes(1))
        .execute(&ctx.db)
        .await
        .unwrap();

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": token, "password": "NewPassw0rd!" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_password_enforces_strength_rules() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let token = reset_token_for(&ctx, "a@b.dk").await.unwrap();

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({ "token": token, "password": "weak" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn a_new_request_supersedes_the_previous_token() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let first = reset_token_for(&ctx, "a@b.dk").await.unwrap();

    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "a@b.dk", "tenantId": "foo-bar" }))
        .await;
    let second = reset_token_for(&ctx, "a@b.dk").await.unwrap();
    assert_ne!(first, second);

    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": first, "password": "NewPassw0rd!" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    ctx.server
        .post("/auth/reset-password")
        .json(&json!({ "token": second, "password": "NewPassw0rd!" }))
        .await
        .assert_status(StatusCode::OK);
}
