//! Authentication and role checks through the full middleware stack.
//!
//! Tests that need PostgreSQL run against `<DATABASE_URL>_test` and are
//! skipped when `DATABASE_URL` is unset.

mod common;

use axum::http::StatusCode;
use common::{db_app, login_as, offline_app, send, token_for, TEST_PASSWORD};
use serde_json::json;
use shared_types::AuthResponse;

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = offline_app();
    let (status, body) = send(&app, "GET", "/api/affaires", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthorized");
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let app = offline_app();
    let (status, _) = send(&app, "GET", "/api/affaires", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lecteur_cannot_open_an_affaire() {
    let app = offline_app();
    let token = token_for(1, "lecteur");
    let (status, body) = send(
        &app,
        "POST",
        "/api/affaires",
        Some(&token),
        Some(json!({"intitule": "X c/ Y", "nature": "civile", "client_nom": "X"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "collaborateur role or higher required");
}

#[tokio::test]
async fn comptable_cannot_manage_users() {
    let app = offline_app();
    let token = token_for(2, "comptable");
    let (status, _) = send(&app, "GET", "/api/utilisateurs", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn collaborateur_cannot_import() {
    let app = offline_app();
    let token = token_for(3, "collaborateur");
    let (status, _) = common::send_raw(
        &app,
        "POST",
        "/api/imports/locataires",
        Some(&token),
        "text/csv",
        "type_locataire,nom\nparticulier,Kone\n".to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_validates_email_before_lookup() {
    let app = offline_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "pas-un-email", "password": "x"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["email"].is_string());
}

#[tokio::test]
async fn login_refresh_and_logout() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (user, _) = login_as(&pool, "comptable").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": user.email, "password": TEST_PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let auth: AuthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(auth.user.id, user.id);
    assert_eq!(auth.user.role, "comptable");

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&auth.access_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], user.email.as_str());

    // Refresh tokens are single use.
    let refresh = json!({"refresh_token": auth.refresh_token});
    let (status, body) = send(&app, "POST", "/api/auth/refresh", None, Some(refresh.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let rotated: AuthResponse = serde_json::from_value(body).unwrap();
    let (status, _) = send(&app, "POST", "/api/auth/refresh", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/auth/logout", Some(&rotated.access_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({"refresh_token": rotated.refresh_token})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (user, _) = login_as(&pool, "lecteur").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": user.email, "password": "mauvais-mot-de-passe"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn admin_cannot_demote_itself() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (admin, token) = login_as(&pool, "admin").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/utilisateurs/{}/role", admin.id),
        Some(&token),
        Some(json!({"role": "lecteur"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
