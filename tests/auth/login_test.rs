use axum::http::StatusCode;
use serde_json::json;

use courtpass::services::hashing;

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn admin_login_returns_tokens_and_session() {
    let ctx = TestContext::new().await;
    let admin_id = ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["club"]["role"], "admin");
    let refresh_token = body["refreshToken"].as_str().unwrap();
    assert_eq!(refresh_token.len(), 64);

    // The session row is keyed by the SHA-256 of the wire token and lives
    // about seven days.
    let token_hash = hashing::hash_refresh_token(refresh_token);
    let (expires_at,): (chrono::DateTime<chrono::Utc>,) =
        sqlx::query_as("SELECT expires_at FROM sessions WHERE token_hash = ? AND principal_id = ?")
            .bind(&token_hash)
            .bind(&admin_id)
            .fetch_one(&ctx.db)
            .await
            .expect("session row exists");
    let ttl = expires_at - chrono::Utc::now();
    assert!(ttl > chrono::Duration::days(6) && ttl <= chrono::Duration::days(7));
}

#[tokio::test]
async fn coach_login_with_pin_is_case_insensitive_on_username() {
    let ctx = TestContext::new().await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "username": "John",
            "pin": "314159"
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["club"]["role"], "coach");
    assert!(body["accessToken"].is_string());

    assert_eq!(ctx.session_count(&coach_id).await, 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    let wrong = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": "WrongPassword1!"
        }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    let wrong_body: serde_json::Value = wrong.json();

    let unknown = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "nobody@b.dk",
            "password": test_password()
        }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    let unknown_body: serde_json::Value = unknown.json();

    assert_eq!(wrong_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn wrong_pin_and_unknown_username_are_indistinguishable() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    let wrong = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "username": "john",
            "pin": "000000"
        }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    let wrong_body: serde_json::Value = wrong.json();

    let unknown = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "username": "ghost",
            "pin": "314159"
        }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    let unknown_body: serde_json::Value = unknown.json();

    assert_eq!(wrong_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn coaches_cannot_login_through_the_email_flow() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    // A coach's email is contact data, not a login identifier.
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "john@b.dk",
            "password": "314159"
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_admin_is_forbidden() {
    let ctx = TestContext::new().await;
    ctx.seed_unverified_admin("foo-bar", "a@b.dk", test_password())
        .await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": test_password()
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_is_scoped_to_the_tenant() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "other-club",
            "email": "a@b.dk",
            "password": test_password()
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_without_a_complete_credential_pair_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "pin": "314159"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn login_with_empty_body_is_unprocessable() {
    let ctx = TestContext::new().await;

    let response = ctx.server.post("/auth/login").json(&json!({})).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn five_failures_lock_out_the_sixth_attempt() {
    let ctx = TestContext::new().await;
    let admin_id = ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    for _ in 0..5 {
        ctx.server
            .post("/auth/login")
            .json(&json!({
                "tenantId": "foo-bar",
                "email": "a@b.dk",
                "password": "WrongPassword1!"
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    // Correct credentials, but the window is exhausted.
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "a@b.dk",
            "password": test_password()
        }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let body: serde_json::Value = response.json();
    let lockout: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["lockoutUntil"].clone()).expect("lockoutUntil timestamp");
    assert!(lockout > chrono::Utc::now());

    assert_eq!(ctx.session_count(&admin_id).await, 0);
}

#[tokio::test]
async fn lockout_is_keyed_by_identifier() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    for _ in 0..5 {
        ctx.server
            .post("/auth/login")
            .json(&json!({
                "tenantId": "foo-bar",
                "email": "a@b.dk",
                "password": "WrongPassword1!"
            }))
            .await;
    }

    // The coach's identifier has a clean history.
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "username": "john",
            "pin": "314159"
        }))
        .await
        .assert_status(StatusCode::OK);
}
