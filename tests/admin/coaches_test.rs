use axum::http::StatusCode;
use serde_json::json;

use courtpass::tenants::Plan;

use crate::common::{test_password, TestContext};

async fn admin_token(ctx: &TestContext, tenant: &str) -> String {
    let email = format!("admin@{tenant}.dk");
    ctx.seed_admin(tenant, &email, test_password()).await;
    let (access, _) = ctx.login_admin(tenant, &email, test_password()).await;
    access
}

#[tokio::test]
async fn create_coach_returns_the_pin_exactly_once() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;

    let response = ctx
        .server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({ "email": "john@b.dk", "username": "John" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    // Canonical username form is lowercase.
    assert_eq!(body["coach"]["username"], "john");
    assert_eq!(body["coach"]["role"], "coach");
    assert_eq!(body["coach"]["emailVerified"], true);

    let pin = body["pin"].as_str().expect("generated PIN disclosed once");
    assert_eq!(pin.len(), 6);
    assert!(pin.chars().all(|c| c.is_ascii_digit()));

    // The disclosed PIN actually works.
    ctx.server
        .post("/auth/login")
        .json(&json!({ "tenantId": "foo-bar", "username": "john", "pin": pin }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn create_coach_with_welcome_email_omits_the_pin() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;

    let response = ctx
        .server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({
            "email": "john@b.dk",
            "username": "john",
            "sendEmail": true
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    assert!(body.get("pin").is_none());
}

#[tokio::test]
async fn create_coach_accepts_a_supplied_pin() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;

    ctx.server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({
            "email": "john@b.dk",
            "username": "john",
            "pin": "314159"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    ctx.server
        .post("/auth/login")
        .json(&json!({ "tenantId": "foo-bar", "username": "john", "pin": "314159" }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn create_coach_rejects_a_malformed_pin() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;

    ctx.server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({
            "email": "john@b.dk",
            "username": "john",
            "pin": "31415"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_username_is_a_conflict_case_insensitively() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    ctx.server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({ "email": "other@b.dk", "username": "JOHN" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    ctx.server
        .post("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({ "email": "john@b.dk", "username": "jane" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn basic_plan_allows_at_most_two_coaches() {
    let ctx = TestContext::new().await;
    ctx.seed_tenant("small-club", Plan::Basic).await;
    let access = admin_token(&ctx, "small-club").await;

    for (i, username) in ["anna", "bo"].iter().enumerate() {
        ctx.server
            .post("/small-club/admin/coaches")
            .authorization_bearer(&access)
            .json(&json!({
                "email": format!("coach{i}@b.dk"),
                "username": username
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    ctx.server
        .post("/small-club/admin/coaches")
        .authorization_bearer(&access)
        .json(&json!({ "email": "coach3@b.dk", "username": "carl" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_is_scoped_to_the_path_tenant() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    ctx.seed_coach("other-club", "jane", "jane@b.dk", "271828").await;

    let response = ctx
        .server
        .get("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .await;
    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    let coaches = body["coaches"].as_array().unwrap();
    assert_eq!(coaches.len(), 1);
    assert_eq!(coaches[0]["username"], "john");
}

#[tokio::test]
async fn get_update_and_delete_a_coach() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    let fetched = ctx
        .server
        .get(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .await;
    fetched.assert_status(StatusCode::OK);

    let updated = ctx
        .server
        .put(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .json(&json!({ "email": "john2@b.dk", "username": "Johnny" }))
        .await;
    updated.assert_status(StatusCode::OK);
    let body: serde_json::Value = updated.json();
    assert_eq!(body["coach"]["email"], "john2@b.dk");
    assert_eq!(body["coach"]["username"], "johnny");

    ctx.server
        .delete(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .get(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    ctx.server
        .delete(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn setting_a_new_pin_terminates_the_coach_sessions() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    ctx.login_coach("foo-bar", "john", "314159").await;
    assert_eq!(ctx.session_count(&coach_id).await, 1);

    ctx.server
        .put(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .json(&json!({ "pin": "271828" }))
        .await
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.session_count(&coach_id).await, 0);
    ctx.server
        .post("/auth/login")
        .json(&json!({ "tenantId": "foo-bar", "username": "john", "pin": "271828" }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn admins_cannot_reach_another_tenants_coaches() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    ctx.seed_tenant("other-club", Plan::Professional).await;

    ctx.server
        .get("/other-club/admin/coaches")
        .authorization_bearer(&access)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admins_cross_tenants() {
    let ctx = TestContext::new().await;
    ctx.seed_super_admin("hq", "root@hq.dk", test_password()).await;
    ctx.seed_tenant("foo-bar", Plan::Professional).await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, _) = ctx.login_admin("hq", "root@hq.dk", test_password()).await;

    let response = ctx
        .server
        .get("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .await;
    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["coaches"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn coaches_cannot_use_the_admin_surface() {
    let ctx = TestContext::new().await;
    ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;
    let (access, _) = ctx.login_coach("foo-bar", "john", "314159").await;

    ctx.server
        .get("/foo-bar/admin/coaches")
        .authorization_bearer(&access)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn the_admin_surface_requires_a_bearer() {
    let ctx = TestContext::new().await;

    ctx.server
        .get("/foo-bar/admin/coaches")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reset_pin_action_issues_a_token_and_sends_the_email() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    ctx.server
        .post(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .json(&json!({ "action": "reset-pin" }))
        .await
        .assert_status(StatusCode::OK);

    let token = ctx.principal_field(&coach_id, "pin_reset_token").await;
    assert!(token.is_some());
}

#[tokio::test]
async fn reset_pin_action_surfaces_a_missing_email_transport() {
    let ctx = TestContext::new_without_email().await;
    let access = admin_token(&ctx, "foo-bar").await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    // Operators asked for this failure to be loud.
    ctx.server
        .post(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .json(&json!({ "action": "reset-pin" }))
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_actions_are_rejected() {
    let ctx = TestContext::new().await;
    let access = admin_token(&ctx, "foo-bar").await;
    let coach_id = ctx.seed_coach("foo-bar", "john", "john@b.dk", "314159").await;

    ctx.server
        .post(&format!("/foo-bar/admin/coaches/{coach_id}"))
        .authorization_bearer(&access)
        .json(&json!({ "action": "promote" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
