//! REST API integration tests.
//!
//! The first group runs without a database: every request is rejected before
//! the first query. The rest need PostgreSQL (`DATABASE_URL`) and skip otherwise.

mod common;

use axum::http::StatusCode;
use common::{db_app, get, login_as, offline_app, post, send, send_raw, token_for};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ── Without a database ──────────────────────────────────────────────

#[tokio::test]
async fn malformed_path_id_is_bad_request() {
    let app = offline_app();
    let token = token_for(1, "lecteur");
    let (status, body) = get(&app, "/api/affaires/pas-un-uuid", &token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid UUID format");
}

#[tokio::test]
async fn empty_intitule_is_a_validation_error() {
    let app = offline_app();
    let token = token_for(1, "collaborateur");
    let (status, body) = post(
        &app,
        "/api/affaires",
        &token,
        json!({"intitule": "", "nature": "civile", "client_nom": "SCI Plateau"}),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "ValidationError");
    assert!(body["field_errors"]["intitule"].is_string());
}

#[tokio::test]
async fn unknown_nature_is_rejected() {
    let app = offline_app();
    let token = token_for(1, "collaborateur");
    let (status, body) = post(
        &app,
        "/api/affaires",
        &token,
        json!({"intitule": "A c/ B", "nature": "spatiale", "client_nom": "A"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("nature"));
}

#[tokio::test]
async fn amounts_beyond_the_ceiling_are_rejected() {
    let app = offline_app();
    let token = token_for(1, "gestionnaire");

    let (status, body) = post(
        &app,
        "/api/dossiers-recouvrement",
        &token,
        json!({
            "creancier_nom": "SGBCI",
            "debiteur_nom": "Diallo Import",
            "montant_principal": i64::MAX,
            "frais": i64::MAX
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["montant_principal"].is_string());
    assert!(body["field_errors"]["frais"].is_string());

    let (status, body) = post(
        &app,
        "/api/factures",
        &token,
        json!({
            "client_id": uuid::Uuid::new_v4(),
            "objet": "Conseil",
            "montant_ht": 1_000_000_000_001_i64
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["montant_ht"].is_string());
}

#[tokio::test]
async fn malformed_rent_period_is_rejected() {
    let app = offline_app();
    let token = token_for(1, "comptable");
    let (status, body) = post(
        &app,
        "/api/encaissements",
        &token,
        json!({
            "lot_id": uuid::Uuid::new_v4(),
            "periode": "mars 2025",
            "montant": 150000,
            "mode_paiement": "especes"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["periode"].is_string());
}

#[tokio::test]
async fn unknown_export_entity_is_not_found() {
    let app = offline_app();
    let token = token_for(1, "lecteur");
    let (status, _) = get(&app, "/api/exports/planetes", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_without_required_column_names_it() {
    let app = offline_app();
    let token = token_for(1, "gestionnaire");
    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/imports/clients-conseil",
        Some(&token),
        "text/csv",
        "type_client;telephone\nentreprise;0102030405\n".to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("nom"));
}

#[tokio::test]
async fn dry_run_import_reports_row_errors() {
    let app = offline_app();
    let token = token_for(1, "gestionnaire");
    let csv = "type_locataire,nom,prenom,raison_sociale\n\
               particulier,Kone,Awa,\n\
               entreprise,,,\n\
               martien,Zorg,,\n";
    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/imports/locataires?dry_run=true",
        Some(&token),
        "text/csv",
        csv.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["lignes_total"], 3);
    assert_eq!(report["lignes_valides"], 1);
    assert_eq!(report["lignes_importees"], 0);
    let lignes: Vec<i64> = report["erreurs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["ligne"].as_i64().unwrap())
        .collect();
    assert_eq!(lignes, vec![3, 4]);
}

#[tokio::test]
async fn docs_are_served() {
    let app = offline_app();
    let (status, body) = send_raw(&app, "GET", "/docs", None, "", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("CAPCO API"));
}

#[tokio::test]
async fn requests_get_an_id() {
    let app = offline_app();
    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/api/auth/me")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// ── With a database ─────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_connected_database() {
    let Some((app, _pool)) = db_app().await else {
        return;
    };
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "connected");
}

#[tokio::test]
async fn affaire_gets_a_yearly_reference_and_synthese() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "collaborateur").await;

    let (status, affaire) = post(
        &app,
        "/api/affaires",
        &token,
        json!({
            "intitule": "SCI Plateau c/ Diallo",
            "nature": "commerciale",
            "juridiction": "Tribunal de commerce d'Abidjan",
            "client_nom": "SCI Plateau",
            "partie_adverse": "Diallo",
            "date_ouverture": "2025-02-03"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let annee = chrono::Datelike::year(&chrono::Utc::now().date_naive());
    assert!(affaire["reference"]
        .as_str()
        .unwrap()
        .starts_with(&format!("AFF-{annee}-")));
    assert_eq!(affaire["statut"], "en_cours");

    let id = affaire["id"].as_str().unwrap();
    let (status, fetched) = get(&app, &format!("/api/affaires/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["reference"], affaire["reference"]);

    let (status, synthese) = get(&app, &format!("/api/affaires/{id}/synthese"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(synthese.is_object());

    let (status, _) = get(&app, &format!("/api/affaires/{}", uuid::Uuid::new_v4()), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rent_collection_applies_building_commission() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, gestion) = login_as(&pool, "gestionnaire").await;

    let (status, immeuble) = post(
        &app,
        "/api/immeubles",
        &gestion,
        json!({
            "nom": "Résidence Lagune",
            "adresse": "Boulevard de Marseille",
            "ville": "Abidjan",
            "proprietaire_nom": "M. Traore",
            "taux_commission": 10.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, lot) = post(
        &app,
        "/api/lots",
        &gestion,
        json!({
            "immeuble_id": immeuble["id"],
            "numero": "A12",
            "type_lot": "appartement",
            "loyer_mensuel": 150000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lot["statut"], "libre");
    let lot_id = lot["id"].as_str().unwrap().to_string();

    let (status, locataire) = post(
        &app,
        "/api/locataires",
        &gestion,
        json!({"type_locataire": "particulier", "nom": "Kone", "prenom": "Awa"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, assigned) = send(
        &app,
        "PATCH",
        &format!("/api/lots/{lot_id}/locataire"),
        Some(&gestion),
        Some(json!({"locataire_id": locataire["id"], "date_entree": "2025-01-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["statut"], "occupe");
    assert_eq!(assigned["locataire_id"], locataire["id"]);

    let (status, encaissement) = post(
        &app,
        "/api/encaissements",
        &gestion,
        json!({
            "lot_id": lot_id,
            "periode": "2025-03",
            "montant": 100000,
            "mode_paiement": "mobile_money"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(encaissement["commission_capco"], 10000);
    assert_eq!(encaissement["montant_net"], 90000);
    assert_eq!(encaissement["locataire_id"], locataire["id"]);

    let (status, impayes) = get(
        &app,
        &format!("/api/encaissements/impayes?periode=2025-03&immeuble_id={}", immeuble["id"].as_str().unwrap()),
        &gestion,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let impayes = impayes.as_array().unwrap();
    assert_eq!(impayes.len(), 1);
    assert_eq!(impayes[0]["reste"], 50000);
}

#[tokio::test]
async fn full_recovery_settles_the_dossier() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;

    let (status, dossier) = post(
        &app,
        "/api/dossiers-recouvrement",
        &token,
        json!({
            "creancier_nom": "SGBCI",
            "debiteur_nom": "Diallo Import",
            "montant_principal": 400000,
            "frais": 50000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{dossier}");
    assert!(dossier["reference"].as_str().unwrap().starts_with("REC-"));
    let id = dossier["id"].as_str().unwrap().to_string();

    for montant in [150000, 300000] {
        let (status, _) = post(
            &app,
            &format!("/api/dossiers-recouvrement/{id}/paiements"),
            &token,
            json!({"montant": montant, "mode_paiement": "virement"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, dossier) = get(&app, &format!("/api/dossiers-recouvrement/{id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dossier["statut"], "solde");
    assert_eq!(dossier["situation"]["reste_du"], 0);
    assert_eq!(dossier["situation"]["montant_recouvre"], 450000);
}

#[tokio::test]
async fn csv_import_then_export_round_trips_locataires() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let marker = format!("Import{}", uuid::Uuid::new_v4().simple());

    let csv = format!("type_locataire;nom;prenom;telephone\nparticulier;{marker};Yao;0707070707\n");
    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/imports/locataires",
        Some(&token),
        "text/csv",
        csv,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["lignes_importees"], 1);

    let (status, exported) = send_raw(&app, "GET", "/api/exports/locataires", Some(&token), "", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(exported.lines().next().unwrap().contains("type_locataire"));
    assert!(exported.contains(&marker));
}
