use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_password, TestContext};

async fn verification_token_for(ctx: &TestContext, email: &str) -> Option<String> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT email_verification_token FROM principals WHERE email = ?")
            .bind(email)
            .fetch_optional(&ctx.db)
            .await
            .unwrap();
    row.and_then(|(token,)| token)
}

#[tokio::test]
async fn register_then_verify_then_login() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("foo-bar", courtpass::tenants::Plan::Basic).await;

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": "new@b.dk",
            "password": test_password(),
            "tenantId": "foo-bar"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    // Login before verification is refused.
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "new@b.dk",
            "password": test_password()
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let token = verification_token_for(&ctx, "new@b.dk")
        .await
        .expect("verification token issued");

    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": token }))
        .await
        .assert_status(StatusCode::OK);

    // Token is cleared and the account is live.
    assert_eq!(verification_token_for(&ctx, "new@b.dk").await, None);
    ctx.server
        .post("/auth/login")
        .json(&json!({
            "tenantId": "foo-bar",
            "email": "new@b.dk",
            "password": test_password()
        }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn verify_email_is_single_use() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("foo-bar", courtpass::tenants::Plan::Basic).await;

    ctx.server
        .post("/auth/register")
        .json(&json!({
            "email": "new@b.dk",
            "password": test_password(),
            "tenantId": "foo-bar"
        }))
        .await;

    let token = verification_token_for(&ctx, "new@b.dk").await.unwrap();

    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": &token }))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": token }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_verification_token_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("foo-bar", courtpass::tenants::Plan::Basic).await;

    ctx.server
        .post("/auth/register")
        .json(&json!({
            "email": "new@b.dk",
            "password": test_password(),
            "tenantId": "foo-bar"
        }))
        .await;

    sqlx::query(
        "UPDATE principals SET email_verification_expires = ? WHERE email = 'new@b.dk'",
    )
    .bind(chrono::Utc::now() - chrono::Duration::hours(1))
    .execute(&ctx.db)
    .await
    .unwrap();

    let token = verification_token_for(&ctx, "new@b.dk").await.unwrap();
    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": token }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_with_unknown_token_is_rejected() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": "f".repeat(64) }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registering_an_existing_email_is_absorbed_silently() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("foo-bar", "a@b.dk", test_password()).await;

    let fresh = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": "other@b.dk",
            "password": test_password(),
            "tenantId": "foo-bar"
        }))
        .await;
    fresh.assert_status(StatusCode::CREATED);
    let fresh_body: serde_json::Value = fresh.json();

    let duplicate = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": "a@b.dk",
            "password": test_password(),
            "tenantId": "foo-bar"
        }))
        .await;
    duplicate.assert_status(StatusCode::CREATED);
    let duplicate_body: serde_json::Value = duplicate.json();

    // Byte-identical success shape in both cases.
    assert_eq!(fresh_body["message"], duplicate_body["message"]);

    // And no second row for the duplicate.
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM principals WHERE email = 'a@b.dk'")
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(count, 1);
}
