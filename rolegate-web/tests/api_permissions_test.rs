//! HTTP-level permission checks against a running server

mod helpers;

use chrono::Utc;
use helpers::{spawn_app, PASSWORD, PASSWORD_USER, TEST_SECRET};
use reqwest::StatusCode;
use rolegate_authz::AuditOutcome;
use rolegate_web::auth::{Claims, JwtService};
use serde_json::{json, Value};

#[tokio::test]
async fn health_is_open() {
    let app = spawn_app().await;

    let response = app.get("/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn read_without_or_with_bad_token_is_forbidden() {
    let app = spawn_app().await;

    let missing = app.get("/api/read", None).await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let garbage = app.get("/api/read", Some("definitely.not.a-jwt")).await;
    assert_eq!(garbage.status(), StatusCode::FORBIDDEN);

    let forged = JwtService::new(b"some-other-secret", 60)
        .unwrap()
        .generate_token("user1")
        .unwrap()
        .access_token;
    let forged = app.get("/api/read", Some(&forged)).await;
    assert_eq!(forged.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_delete_and_user_cannot() {
    let app = spawn_app().await;
    let admin = app.token_for("user1");
    let user = app.token_for("user2");

    let response = app.delete("/api/delete", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.delete("/api/delete", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/api/read", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"], "This is some protected data.");
}

#[tokio::test]
async fn forbidden_body_never_reveals_the_reason() {
    let app = spawn_app().await;
    let user = app.token_for("user2");

    let no_token: Value = app.get("/api/read", None).await.json().await.unwrap();
    let wrong_role: Value = app
        .delete("/api/delete", Some(&user))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(no_token, json!({ "message": "Access denied" }));
    assert_eq!(wrong_role, no_token);

    // The reason still lands in the audit trail
    let denies: Vec<_> = app
        .audit
        .records()
        .into_iter()
        .filter(|r| r.outcome == AuditOutcome::Deny)
        .collect();
    assert_eq!(denies.len(), 2);
    assert!(denies.iter().all(|r| r.reason.is_some()));
    assert_eq!(denies[1].identity.as_deref(), Some("user2"));
}

#[tokio::test]
async fn expired_token_is_denied() {
    let app = spawn_app().await;
    let now = Utc::now().timestamp();
    let expired = JwtService::new(TEST_SECRET.as_bytes(), 60)
        .unwrap()
        .encode_claims(&Claims {
            sub: "user1".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        })
        .unwrap();

    let response = app.delete("/api/delete", Some(&expired)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_issues_a_working_token() {
    let app = spawn_app().await;

    let response = app.post_login(PASSWORD_USER, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);

    let token = body["access_token"].as_str().unwrap();
    let response = app.get("/api/read", Some(token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post("/api/write", Some(token), &json!({"k": "v"})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_with_bad_password_is_unauthorized() {
    let app = spawn_app().await;

    let response = app.post_login(PASSWORD_USER, "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.post_login("nobody", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn write_then_delete_round() {
    let app = spawn_app().await;
    let admin = app.token_for("user1");

    let response = app
        .post("/api/write", Some(&admin), &json!({"note": "first"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["stored"], 1);

    let response = app.delete("/api/delete", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.state.records.read().await.is_empty());
}

#[tokio::test]
async fn user_registration_flow() {
    let app = spawn_app().await;
    let admin = app.token_for("user1");
    let user = app.token_for("user2");
    let new_user = json!({"username": "grace", "password": "hopper-1906", "role": "user"});

    let response = app.post("/api/users", Some(&user), &new_user).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.post("/api/users", Some(&admin), &new_user).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.post("/api/users", Some(&admin), &new_user).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let weak = json!({"username": "heidi", "password": "short", "role": "user"});
    let response = app.post("/api/users", Some(&admin), &weak).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unknown_role = json!({"username": "ivan", "password": "long-enough", "role": "root"});
    let response = app.post("/api/users", Some(&admin), &unknown_role).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post_login("grace", "hopper-1906").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/users?limit=2", Some(&user)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 4);
    assert_eq!(body["users"][0]["username"], "alice");
    assert_eq!(body["users"][1]["username"], "grace");
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn me_reflects_the_granted_role() {
    let app = spawn_app().await;
    let admin = app.token_for("user1");

    let body: Value = app.get("/api/me", Some(&admin)).await.json().await.unwrap();
    assert_eq!(body["username"], "user1");
    assert_eq!(body["role"], "admin");
    assert_eq!(
        body["permissions"],
        json!(["delete", "manage_users", "read", "write"])
    );
}
