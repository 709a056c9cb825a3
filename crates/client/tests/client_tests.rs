//! Client behaviour against a small in-process stand-in for the API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use capco_client::CapcoClient;
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shared_types::{AffaireListParams, AppError, AppErrorKind, AuthResponse, User};

#[derive(Default)]
struct Hits {
    affaires_list: AtomicUsize,
    affaires_create: AtomicUsize,
    refresh: AtomicUsize,
}

type Shared = State<Arc<Hits>>;

fn affaire(id: &str) -> Value {
    json!({
        "id": id,
        "reference": "AFF-2026-0001",
        "intitule": "Bail commercial",
        "nature": "civile",
        "juridiction": "TPI Cotonou",
        "client_nom": "SCI Horizon",
        "statut": "en_cours",
        "date_ouverture": "2026-01-05",
        "created_at": "2026-01-05T09:00:00Z",
        "updated_at": "2026-01-05T09:00:00Z"
    })
}

fn page(data: Vec<Value>) -> Value {
    let total = data.len();
    json!({
        "data": data,
        "meta": {
            "page": 1, "limit": 20, "total": total, "total_pages": 1,
            "has_next": false, "has_prev": false
        }
    })
}

fn error(status: StatusCode, err: AppError) -> Response {
    (status, Json(serde_json::to_value(err).unwrap_or_default())).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn list_affaires(State(hits): Shared, headers: HeaderMap) -> Response {
    if bearer(&headers) == Some("expired") {
        return error(StatusCode::UNAUTHORIZED, AppError::unauthorized("Token expired"));
    }
    hits.affaires_list.fetch_add(1, Ordering::SeqCst);
    Json(page(vec![affaire("00000000-0000-0000-0000-000000000001")])).into_response()
}

async fn create_affaire(State(hits): Shared, Json(body): Json<Value>) -> Response {
    hits.affaires_create.fetch_add(1, Ordering::SeqCst);
    if body["intitule"].as_str().unwrap_or_default().is_empty() {
        let fields = HashMap::from([("intitule".to_string(), "Intitulé cannot be empty".to_string())]);
        return error(
            StatusCode::UNPROCESSABLE_ENTITY,
            AppError::validation("Validation failed", fields),
        );
    }
    (StatusCode::CREATED, Json(affaire("00000000-0000-0000-0000-000000000002"))).into_response()
}

async fn get_affaire() -> Response {
    error(StatusCode::NOT_FOUND, AppError::not_found("Affaire not found"))
}

async fn refresh(State(hits): Shared, Json(body): Json<Value>) -> Response {
    hits.refresh.fetch_add(1, Ordering::SeqCst);
    if body["refresh_token"] != "good-refresh" {
        return error(StatusCode::UNAUTHORIZED, AppError::unauthorized("Invalid refresh token"));
    }
    let now = Utc::now();
    let auth = AuthResponse {
        user: User {
            id: 1,
            email: "admin@capco.test".into(),
            nom: "Admin".into(),
            prenom: "Capco".into(),
            role: "admin".into(),
            actif: true,
            created_at: now,
            updated_at: now,
        },
        access_token: "fresh".into(),
        refresh_token: "rotated".into(),
        expires_in: 900,
    };
    Json(auth).into_response()
}

async fn spawn_api() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/api/affaires", get(list_affaires).post(create_affaire))
        .route("/api/affaires/{id}", get(get_affaire))
        .route("/api/auth/refresh", post(refresh))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), hits)
}

fn new_affaire(intitule: &str) -> shared_types::CreateAffaireRequest {
    serde_json::from_value(json!({
        "intitule": intitule,
        "nature": "civile",
        "juridiction": "TPI Cotonou",
        "client_nom": "SCI Horizon"
    }))
    .unwrap()
}

#[tokio::test]
async fn repeated_reads_are_served_from_cache() {
    let (url, hits) = spawn_api().await;
    let client = CapcoClient::new(url);
    client.set_tokens("valid", "good-refresh");

    let params = AffaireListParams::default();
    let first = client.affaires().list(&params).await.unwrap();
    let second = client.affaires().list(&params).await.unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(first.data.len(), 1);
    assert_eq!(hits.affaires_list.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn creating_an_affaire_invalidates_the_list() {
    let (url, hits) = spawn_api().await;
    let client = CapcoClient::new(url);
    client.set_tokens("valid", "good-refresh");

    let params = AffaireListParams::default();
    client.affaires().list(&params).await.unwrap();
    let created = client
        .affaires()
        .create(&new_affaire("Bail commercial"))
        .await
        .unwrap();
    assert_eq!(created.reference, "AFF-2026-0001");

    client.affaires().list(&params).await.unwrap();
    assert_eq!(hits.affaires_list.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn zero_ttl_always_hits_the_server() {
    let (url, hits) = spawn_api().await;
    let client = CapcoClient::with_cache_ttl(url, Duration::ZERO);
    client.set_tokens("valid", "good-refresh");

    let params = AffaireListParams::default();
    client.affaires().list(&params).await.unwrap();
    client.affaires().list(&params).await.unwrap();
    assert_eq!(hits.affaires_list.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn api_errors_are_decoded() {
    let (url, _) = spawn_api().await;
    let client = CapcoClient::new(url);
    client.set_tokens("valid", "good-refresh");

    let err = client
        .affaires()
        .get(uuid::Uuid::nil())
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::NotFound);
    assert_eq!(err.message, "Affaire not found");

    let err = client.affaires().create(&new_affaire("")).await.unwrap_err();
    assert_eq!(err.kind, AppErrorKind::ValidationError);
    assert!(err.field_errors.contains_key("intitule"));
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once() {
    let (url, hits) = spawn_api().await;
    let client = CapcoClient::new(url);
    client.set_tokens("expired", "good-refresh");

    let page = client
        .affaires()
        .list(&AffaireListParams::default())
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(hits.refresh.load(Ordering::SeqCst), 1);
    assert_eq!(client.access_token().as_deref(), Some("fresh"));
    assert_eq!(client.refresh_token().as_deref(), Some("rotated"));
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
    let (url, hits) = spawn_api().await;
    let client = CapcoClient::new(url);
    client.set_tokens("expired", "revoked");

    let err = client
        .affaires()
        .list(&AffaireListParams::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, AppErrorKind::Unauthorized);
    assert_eq!(hits.refresh.load(Ordering::SeqCst), 1);
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn unreachable_server_is_an_internal_error() {
    let client = CapcoClient::new("http://127.0.0.1:1");
    let err = client
        .affaires()
        .list(&AffaireListParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, AppErrorKind::InternalError);
    assert!(err.message.starts_with("Request failed"));
}
