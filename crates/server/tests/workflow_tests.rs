//! Status workflows and business rules that span several requests.
//!
//! Every test needs PostgreSQL (`DATABASE_URL`) and skips otherwise.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{db_app, get, login_as, post, send, send_raw};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

async fn delete(app: &Router, uri: &str, token: &str) -> StatusCode {
    send(app, "DELETE", uri, Some(token), None).await.0
}

async fn new_affaire(app: &Router, token: &str) -> Value {
    let (status, affaire) = post(
        app,
        "/api/affaires",
        token,
        json!({
            "intitule": "Banque Atlantique c/ Kouassi",
            "nature": "civile",
            "juridiction": "TPI Abidjan-Plateau",
            "client_nom": "Banque Atlantique"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{affaire}");
    affaire
}

async fn new_immeuble(app: &Router, token: &str) -> Value {
    let (status, immeuble) = post(
        app,
        "/api/immeubles",
        token,
        json!({
            "nom": "Immeuble Les Cocotiers",
            "adresse": "Rue des Jardins",
            "ville": "Abidjan",
            "proprietaire_nom": "Mme Bamba",
            "taux_commission": 8.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{immeuble}");
    immeuble
}

async fn new_lot(app: &Router, token: &str, immeuble: &Value, numero: &str, statut: &str) -> (StatusCode, Value) {
    post(
        app,
        "/api/lots",
        token,
        json!({
            "immeuble_id": immeuble["id"],
            "numero": numero,
            "type_lot": "bureau",
            "loyer_mensuel": 200000,
            "statut": statut
        }),
    )
    .await
}

async fn new_facture(app: &Router, token: &str, montant_ht: i64) -> Value {
    let (status, client) = post(
        app,
        "/api/clients-conseil",
        token,
        json!({"type_client": "entreprise", "nom": "Orange CI", "honoraire_mensuel": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{client}");

    let (status, facture) = post(
        app,
        "/api/factures",
        token,
        json!({
            "client_id": client["id"],
            "objet": "Conseil juridique mars",
            "montant_ht": montant_ht,
            "taux_tva": 18.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{facture}");
    assert_eq!(facture["statut"], "brouillon");
    facture
}

async fn pay_facture(app: &Router, token: &str, facture_id: &str, montant: i64) -> (StatusCode, Value) {
    post(
        app,
        &format!("/api/factures/{facture_id}/paiements"),
        token,
        json!({"montant": montant, "mode_paiement": "virement"}),
    )
    .await
}

async fn facture_statut(app: &Router, token: &str, facture_id: &str) -> Value {
    let (status, facture) = get(app, &format!("/api/factures/{facture_id}"), token).await;
    assert_eq!(status, StatusCode::OK);
    facture["statut"].clone()
}

// ── Audiences ───────────────────────────────────────────────────────

#[tokio::test]
async fn renvoi_schedules_the_next_hearing_until_the_outcome_is_removed() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let affaire = new_affaire(&app, &token).await;

    let (status, audience) = post(
        &app,
        "/api/audiences",
        &token,
        json!({
            "affaire_id": affaire["id"],
            "date_audience": "2025-04-10",
            "heure": "09:00:00",
            "juridiction": "TPI Abidjan-Plateau",
            "salle": "Salle 2",
            "objet": "Mise en état"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{audience}");
    assert_eq!(audience["statut"], "programmee");
    let audience_id = id_of(&audience);

    let (status, outcome) = post(
        &app,
        &format!("/api/audiences/{audience_id}/resultat"),
        &token,
        json!({"type_resultat": "renvoi", "date_prochaine_audience": "2025-05-15"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{outcome}");
    let suivante = &outcome["audience_suivante"];
    assert_eq!(suivante["date_audience"], "2025-05-15");
    assert_eq!(suivante["statut"], "programmee");
    assert_eq!(suivante["affaire_id"], affaire["id"]);
    assert_eq!(suivante["salle"], "Salle 2");
    assert_eq!(outcome["resultat"]["audience_suivante_id"], suivante["id"]);

    let (_, current) = get(&app, &format!("/api/audiences/{audience_id}"), &token).await;
    assert_eq!(current["statut"], "renvoyee");

    let (status, _) = post(
        &app,
        &format!("/api/audiences/{audience_id}/resultat"),
        &token,
        json!({"type_resultat": "jugement", "decision": "Condamnation"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let resultat_id = id_of(&outcome["resultat"]);
    assert_eq!(
        delete(&app, &format!("/api/resultats/{resultat_id}"), &token).await,
        StatusCode::NO_CONTENT
    );

    let (_, current) = get(&app, &format!("/api/audiences/{audience_id}"), &token).await;
    assert_eq!(current["statut"], "programmee");
    let (status, _) = get(&app, &format!("/api/audiences/{audience_id}/resultat"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let suivante_id = suivante["id"].as_str().unwrap();
    let (status, _) = get(&app, &format!("/api/audiences/{suivante_id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Honoraires ──────────────────────────────────────────────────────

#[tokio::test]
async fn agreed_fee_cannot_drop_below_what_was_paid() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let affaire = new_affaire(&app, &token).await;

    let (status, honoraires) = post(
        &app,
        "/api/honoraires",
        &token,
        json!({
            "affaire_id": affaire["id"],
            "libelle": "Forfait première instance",
            "mode_facturation": "forfait",
            "montant_convenu": 1000000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{honoraires}");
    let id = id_of(&honoraires);

    let (status, _) = post(
        &app,
        &format!("/api/honoraires/{id}/paiements"),
        &token,
        json!({"montant": 600000, "mode_paiement": "cheque"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/honoraires/{id}"),
        Some(&token),
        Some(json!({"montant_convenu": 500000})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["montant_convenu"].is_string());

    let (status, body) = post(
        &app,
        &format!("/api/honoraires/{id}/paiements"),
        &token,
        json!({"montant": 400001, "mode_paiement": "cheque"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["montant"].is_string());

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/honoraires/{id}"),
        Some(&token),
        Some(json!({"montant_convenu": 600000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["reste_a_payer"], 0);
}

// ── Factures ────────────────────────────────────────────────────────

#[tokio::test]
async fn invoice_status_follows_its_payments() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let facture = new_facture(&app, &token, 100000).await;
    let id = id_of(&facture);
    assert_eq!(facture["montant_ttc"], 118000);

    let (status, _) = pay_facture(&app, &token, &id, 1000).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, emise) = post(&app, &format!("/api/factures/{id}/emettre"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{emise}");
    assert_eq!(emise["statut"], "emise");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/factures/{id}"),
        Some(&token),
        Some(json!({"objet": "Modifié"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(delete(&app, &format!("/api/factures/{id}"), &token).await, StatusCode::CONFLICT);

    let (status, _) = pay_facture(&app, &token, &id, 18000).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(facture_statut(&app, &token, &id).await, "partiellement_payee");

    let (status, _) = pay_facture(&app, &token, &id, 100001).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, solde) = pay_facture(&app, &token, &id, 100000).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(facture_statut(&app, &token, &id).await, "payee");

    let paiement_id = id_of(&solde);
    assert_eq!(
        delete(&app, &format!("/api/paiements-conseil/{paiement_id}"), &token).await,
        StatusCode::NO_CONTENT
    );
    assert_eq!(facture_statut(&app, &token, &id).await, "partiellement_payee");

    let (status, _) = post(&app, &format!("/api/factures/{id}/annuler"), &token, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(facture_statut(&app, &token, &id).await, "partiellement_payee");
}

#[tokio::test]
async fn zero_invoice_is_paid_as_soon_as_it_is_issued() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let facture = new_facture(&app, &token, 0).await;
    let id = id_of(&facture);

    let (status, emise) = post(&app, &format!("/api/factures/{id}/emettre"), &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(emise["statut"], "payee");
    assert_eq!(emise["reste_a_payer"], 0);
}

// ── Recouvrement ────────────────────────────────────────────────────

async fn new_dossier(app: &Router, token: &str, principal: i64) -> String {
    let (status, dossier) = post(
        app,
        "/api/dossiers-recouvrement",
        token,
        json!({
            "creancier_nom": "Ecobank",
            "debiteur_nom": "Soro Transport",
            "montant_principal": principal
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{dossier}");
    id_of(&dossier)
}

#[tokio::test]
async fn closed_dossier_refuses_actions_and_payments() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let id = new_dossier(&app, &token, 250000).await;

    let (status, dossier) = send(
        &app,
        "PATCH",
        &format!("/api/dossiers-recouvrement/{id}/statut"),
        Some(&token),
        Some(json!({"statut": "cloture"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dossier["statut"], "cloture");
    assert!(dossier["date_cloture"].is_string());

    let (status, _) = post(
        &app,
        &format!("/api/dossiers-recouvrement/{id}/actions"),
        &token,
        json!({"type_action": "relance", "description": "Relance téléphonique"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(
        &app,
        &format!("/api/dossiers-recouvrement/{id}/paiements"),
        &token,
        json!({"montant": 1000, "mode_paiement": "especes"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn removing_a_payment_reopens_a_settled_dossier() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let id = new_dossier(&app, &token, 300000).await;

    let (status, paiement) = post(
        &app,
        &format!("/api/dossiers-recouvrement/{id}/paiements"),
        &token,
        json!({"montant": 300000, "mode_paiement": "virement"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, dossier) = get(&app, &format!("/api/dossiers-recouvrement/{id}"), &token).await;
    assert_eq!(dossier["statut"], "solde");

    let paiement_id = id_of(&paiement);
    assert_eq!(
        delete(&app, &format!("/api/paiements-recouvrement/{paiement_id}"), &token).await,
        StatusCode::NO_CONTENT
    );

    let (_, dossier) = get(&app, &format!("/api/dossiers-recouvrement/{id}"), &token).await;
    assert_eq!(dossier["statut"], "amiable");
    assert_eq!(dossier["date_cloture"], Value::Null);
    assert_eq!(dossier["situation"]["reste_du"], 300000);
}

// ── Immobilier ──────────────────────────────────────────────────────

#[tokio::test]
async fn lot_under_works_cannot_take_a_tenant() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let immeuble = new_immeuble(&app, &token).await;

    let (status, lot) = new_lot(&app, &token, &immeuble, "RDC-1", "travaux").await;
    assert_eq!(status, StatusCode::CREATED, "{lot}");

    let (status, locataire) = post(
        &app,
        "/api/locataires",
        &token,
        json!({"type_locataire": "entreprise", "raison_sociale": "Pharmacie du Port"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{locataire}");

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/lots/{}/locataire", id_of(&lot)),
        Some(&token),
        Some(json!({"locataire_id": locataire["id"], "date_entree": "2025-02-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = new_lot(&app, &token, &immeuble, "RDC-1", "libre").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn rent_for_an_unknown_tenant_names_the_field() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let immeuble = new_immeuble(&app, &token).await;
    let (_, lot) = new_lot(&app, &token, &immeuble, "B2", "libre").await;

    let (status, body) = post(
        &app,
        "/api/encaissements",
        &token,
        json!({
            "lot_id": lot["id"],
            "locataire_id": uuid::Uuid::new_v4(),
            "periode": "2025-03",
            "montant": 200000,
            "mode_paiement": "especes"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"]["locataire_id"].is_string());
}

#[tokio::test]
async fn import_failing_on_insert_writes_nothing() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let immeuble = new_immeuble(&app, &token).await;
    let reference = immeuble["reference"].as_str().unwrap();

    let csv = format!(
        "immeuble_reference,numero,type_lot,loyer_mensuel\n\
         {reference},C1,bureau,80000\n\
         {reference},C2,commerce,120000\n\
         {reference},C1,bureau,90000\n"
    );
    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/imports/lots?dry_run=false",
        Some(&token),
        "text/csv",
        csv,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert!(body.contains("Line 4"));

    let (status, lots) = get(&app, &format!("/api/immeubles/{}/lots", id_of(&immeuble)), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lots, json!([]));
}

#[tokio::test]
async fn import_with_an_invalid_row_writes_nothing() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "gestionnaire").await;
    let marker = format!("Partiel{}", uuid::Uuid::new_v4().simple());

    let csv = format!(
        "type_locataire,nom,prenom,raison_sociale\n\
         particulier,{marker},Ama,\n\
         entreprise,,,\n"
    );
    let (status, body) = send_raw(
        &app,
        "POST",
        "/api/imports/locataires?dry_run=false",
        Some(&token),
        "text/csv",
        csv,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["dry_run"], false);
    assert_eq!(report["lignes_valides"], 1);
    assert_eq!(report["lignes_importees"], 0);
    assert_eq!(report["erreurs"][0]["ligne"], 3);

    let (status, found) = get(&app, &format!("/api/locataires?q={marker}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["meta"]["total"], 0);
}

// ── Pagination ──────────────────────────────────────────────────────

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
    let Some((app, pool)) = db_app().await else {
        return;
    };
    let (_, token) = login_as(&pool, "lecteur").await;
    let (status, page) = get(
        &app,
        &format!("/api/affaires?page={}&limit=100", i64::MAX),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{page}");
    assert_eq!(page["data"], json!([]));
    assert_eq!(page["meta"]["has_next"], false);
}

#[tokio::test]
async fn bigint_overflow_in_sql_is_a_bad_request() {
    let Some((_app, pool)) = db_app().await else {
        return;
    };
    let err = sqlx::query_scalar::<_, i64>("SELECT (9223372036854775807::NUMERIC + 1)::BIGINT")
        .fetch_one(&pool)
        .await
        .unwrap_err();
    let err = server::error_convert::sqlx_to_app_error(err);
    assert_eq!(err.status_code_u16(), 400);
}
