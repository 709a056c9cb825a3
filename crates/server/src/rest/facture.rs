use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    check_echeance, AppError, CreateFactureRequest, CreatePaiementRequest, FactureListParams,
    FactureResponse, PaginatedResponse, PaiementConseil, UpdateFactureRequest, FACTURE_STATUTS,
    MODES_PAIEMENT,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COMPTABLE};
use crate::error_convert::{check_vocab, ValidateRequest};

fn facture_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Facture {} not found", id))
}

/// Re-read an invoice with its payment situation and refresh its search entry.
async fn reload(pool: &Pool<Postgres>, id: Uuid) -> Result<FactureResponse, AppError> {
    let row = crate::repo::conseil::find_facture(pool, id)
        .await?
        .ok_or_else(|| facture_not_found(&id.to_string()))?;
    crate::search::index(&row.facture);
    Ok(FactureResponse::from(row))
}

/// POST /api/factures
///
/// Creates a `brouillon`; VAT defaults to the configured rate.
#[utoipa::path(
    post,
    path = "/api/factures",
    request_body = CreateFactureRequest,
    responses(
        (status = 201, description = "Draft invoice created", body = FactureResponse),
        (status = 400, description = "Unknown client", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_facture(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Json(body): Json<CreateFactureRequest>,
) -> Result<(StatusCode, Json<FactureResponse>), AppError> {
    body.validate_request()?;
    let date_emission = body
        .date_emission
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    check_echeance(date_emission, body.date_echeance)
        .map_err(|msg| AppError::invalid_field("date_echeance", msg))?;

    let taux_defaut = crate::config::cabinet().taux_tva;
    let facture = crate::repo::conseil::create_facture(&pool, &body, taux_defaut).await?;

    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "facture",
        facture.id,
        serde_json::json!({ "numero": facture.numero, "montant_ttc": facture.montant_ttc }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(reload(&pool, facture.id).await?)))
}

#[utoipa::path(
    get,
    path = "/api/factures",
    params(FactureListParams),
    responses(
        (status = 200, description = "Paginated invoices with payment situation", body = PaginatedResponse<FactureResponse>)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_factures(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<FactureListParams>,
) -> Result<Json<PaginatedResponse<FactureResponse>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, FACTURE_STATUTS)?;
    }
    let page = crate::repo::conseil::list_factures(&pool, &params).await?;
    Ok(Json(page.map(FactureResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/factures/{id}",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 200, description = "Invoice with payment situation", body = FactureResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_facture(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<FactureResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    let row = crate::repo::conseil::find_facture(&pool, uuid)
        .await?
        .ok_or_else(|| facture_not_found(&id))?;
    Ok(Json(FactureResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/factures/{id}",
    params(("id" = String, Path, description = "Facture UUID")),
    request_body = UpdateFactureRequest,
    responses(
        (status = 200, description = "Draft updated, amounts recomputed", body = FactureResponse),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Invoice no longer a draft", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_facture(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<UpdateFactureRequest>,
) -> Result<Json<FactureResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;

    crate::repo::conseil::update_facture(&pool, uuid, &body)
        .await?
        .ok_or_else(|| facture_not_found(&id))?;

    crate::audit::log(&pool, &claims, "update", "facture", uuid).await;
    Ok(Json(reload(&pool, uuid).await?))
}

#[utoipa::path(
    delete,
    path = "/api/factures/{id}",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Invoice no longer a draft", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_facture(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::conseil::delete_facture(&pool, uuid).await? {
        return Err(facture_not_found(&id));
    }
    crate::search::unindex("facture", uuid);
    crate::audit::log(&pool, &claims, "delete", "facture", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/factures/{id}/emettre",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 200, description = "Invoice issued", body = FactureResponse),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Invoice is not a draft", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn emettre_facture(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<Json<FactureResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::conseil::emettre(&pool, uuid).await? {
        return Err(facture_not_found(&id));
    }
    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "facture",
        uuid,
        serde_json::json!({ "statut": "emise" }),
    )
    .await;
    Ok(Json(reload(&pool, uuid).await?))
}

#[utoipa::path(
    post,
    path = "/api/factures/{id}/annuler",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 200, description = "Invoice cancelled", body = FactureResponse),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Invoice has payments or is already cancelled", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn annuler_facture(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<Json<FactureResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::conseil::annuler(&pool, uuid).await? {
        return Err(facture_not_found(&id));
    }
    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "facture",
        uuid,
        serde_json::json!({ "statut": "annulee" }),
    )
    .await;
    Ok(Json(reload(&pool, uuid).await?))
}

// ── Paiements ──────────────────────────────────────────

/// POST /api/factures/{id}/paiements
///
/// Accepted on `emise` and `partiellement_payee` invoices only.
#[utoipa::path(
    post,
    path = "/api/factures/{id}/paiements",
    params(("id" = String, Path, description = "Facture UUID")),
    request_body = CreatePaiementRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaiementConseil),
        (status = 400, description = "Amount exceeds the balance", body = AppError),
        (status = 404, description = "Invoice not found", body = AppError),
        (status = 409, description = "Invoice not payable", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool, body), fields(montant = body.montant))]
pub async fn create_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<CreatePaiementRequest>,
) -> Result<(StatusCode, Json<PaiementConseil>), AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    check_vocab("mode_paiement", &body.mode_paiement, MODES_PAIEMENT)?;

    let paiement = crate::repo::conseil::create_paiement(&pool, uuid, &body)
        .await?
        .ok_or_else(|| facture_not_found(&id))?;

    reload(&pool, uuid).await?;
    crate::audit::log_with(
        &pool,
        &claims,
        "payment",
        "facture",
        uuid,
        serde_json::json!({ "paiement_id": paiement.id, "montant": paiement.montant }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(paiement)))
}

#[utoipa::path(
    get,
    path = "/api/factures/{id}/paiements",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 200, description = "Payments, oldest first", body = Vec<PaiementConseil>),
        (status = 404, description = "Invoice not found", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_paiements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaiementConseil>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::conseil::find_facture(&pool, uuid).await?.is_none() {
        return Err(facture_not_found(&id));
    }
    Ok(Json(crate::repo::conseil::list_paiements(&pool, uuid).await?))
}

#[utoipa::path(
    delete,
    path = "/api/paiements-conseil/{id}",
    params(("id" = String, Path, description = "Payment UUID")),
    responses(
        (status = 204, description = "Payment deleted, invoice status re-derived"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "factures"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::conseil::delete_paiement(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Paiement {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "paiement_conseil", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
