use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AppError, CreateDepenseRequest, CreateHonorairesRequest, CreatePaiementRequest, Depense,
    DepensesAffaire, Honoraires, HonorairesResponse, PaiementHonoraires, UpdateDepenseRequest,
    UpdateHonorairesRequest, DEPENSE_CATEGORIES, MODES_FACTURATION, MODES_PAIEMENT,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COMPTABLE};
use crate::error_convert::{check_vocab, ValidateRequest};

fn honoraires_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Honoraires {} not found", id))
}

async fn ensure_affaire(pool: &Pool<Postgres>, id: &str) -> Result<uuid::Uuid, AppError> {
    let uuid = parse_uuid(id)?;
    match crate::repo::affaire::find_by_id(pool, uuid).await? {
        Some(_) => Ok(uuid),
        None => Err(AppError::not_found(format!("Affaire {} not found", id))),
    }
}

// ── Fee agreements ─────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/honoraires",
    request_body = CreateHonorairesRequest,
    responses(
        (status = 201, description = "Fee agreement created", body = Honoraires),
        (status = 400, description = "Unknown affaire or billing mode", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_honoraires(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Json(body): Json<CreateHonorairesRequest>,
) -> Result<(StatusCode, Json<Honoraires>), AppError> {
    body.validate_request()?;
    check_vocab("mode_facturation", &body.mode_facturation, MODES_FACTURATION)?;

    let honoraires = crate::repo::honoraires::create(&pool, &body).await?;
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "honoraires",
        honoraires.id,
        serde_json::json!({ "affaire_id": body.affaire_id, "montant_convenu": body.montant_convenu }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(honoraires)))
}

#[utoipa::path(
    get,
    path = "/api/affaires/{id}/honoraires",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Fee agreements with paid and remaining amounts", body = Vec<HonorairesResponse>),
        (status = 404, description = "Affaire not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_affaire_honoraires(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<HonorairesResponse>>, AppError> {
    let affaire_id = ensure_affaire(&pool, &id).await?;
    let rows = crate::repo::honoraires::list_by_affaire(&pool, affaire_id).await?;
    Ok(Json(rows.into_iter().map(HonorairesResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/honoraires/{id}",
    params(("id" = String, Path, description = "Honoraires UUID")),
    responses(
        (status = 200, description = "Fee agreement", body = HonorairesResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_honoraires(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<HonorairesResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    let row = crate::repo::honoraires::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| honoraires_not_found(&id))?;
    Ok(Json(HonorairesResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/honoraires/{id}",
    params(("id" = String, Path, description = "Honoraires UUID")),
    request_body = UpdateHonorairesRequest,
    responses(
        (status = 200, description = "Fee agreement updated", body = HonorairesResponse),
        (status = 400, description = "Agreed amount below what is paid", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_honoraires(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<UpdateHonorairesRequest>,
) -> Result<Json<HonorairesResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    if let Some(mode) = body.mode_facturation.as_deref() {
        check_vocab("mode_facturation", mode, MODES_FACTURATION)?;
    }

    crate::repo::honoraires::update(&pool, uuid, &body)
        .await?
        .ok_or_else(|| honoraires_not_found(&id))?;
    let row = crate::repo::honoraires::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| honoraires_not_found(&id))?;

    crate::audit::log(&pool, &claims, "update", "honoraires", uuid).await;
    Ok(Json(HonorairesResponse::from(row)))
}

#[utoipa::path(
    delete,
    path = "/api/honoraires/{id}",
    params(("id" = String, Path, description = "Honoraires UUID")),
    responses(
        (status = 204, description = "Fee agreement and its payments deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_honoraires(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::honoraires::delete(&pool, uuid).await? {
        return Err(honoraires_not_found(&id));
    }
    crate::audit::log(&pool, &claims, "delete", "honoraires", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Payments ───────────────────────────────────────────

/// POST /api/honoraires/{id}/paiements
///
/// The amount must be positive and at most the remaining balance.
#[utoipa::path(
    post,
    path = "/api/honoraires/{id}/paiements",
    params(("id" = String, Path, description = "Honoraires UUID")),
    request_body = CreatePaiementRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaiementHonoraires),
        (status = 400, description = "Amount exceeds the remaining balance", body = AppError),
        (status = 404, description = "Fee agreement not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool, body), fields(montant = body.montant))]
pub async fn create_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<CreatePaiementRequest>,
) -> Result<(StatusCode, Json<PaiementHonoraires>), AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    check_vocab("mode_paiement", &body.mode_paiement, MODES_PAIEMENT)?;

    let paiement = crate::repo::honoraires::create_paiement(&pool, uuid, &body)
        .await?
        .ok_or_else(|| honoraires_not_found(&id))?;

    crate::audit::log_with(
        &pool,
        &claims,
        "payment",
        "honoraires",
        uuid,
        serde_json::json!({ "paiement_id": paiement.id, "montant": paiement.montant }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(paiement)))
}

#[utoipa::path(
    get,
    path = "/api/honoraires/{id}/paiements",
    params(("id" = String, Path, description = "Honoraires UUID")),
    responses(
        (status = 200, description = "Payments, oldest first", body = Vec<PaiementHonoraires>),
        (status = 404, description = "Fee agreement not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_paiements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaiementHonoraires>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::honoraires::find_by_id(&pool, uuid).await?.is_none() {
        return Err(honoraires_not_found(&id));
    }
    Ok(Json(crate::repo::honoraires::list_paiements(&pool, uuid).await?))
}

#[utoipa::path(
    delete,
    path = "/api/paiements-honoraires/{id}",
    params(("id" = String, Path, description = "Payment UUID")),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "honoraires"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::honoraires::delete_paiement(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Paiement {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "paiement_honoraires", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Dépenses ───────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/depenses",
    request_body = CreateDepenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = Depense),
        (status = 400, description = "Unknown affaire or category", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "depenses"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_depense(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Json(body): Json<CreateDepenseRequest>,
) -> Result<(StatusCode, Json<Depense>), AppError> {
    body.validate_request()?;
    check_vocab("categorie", &body.categorie, DEPENSE_CATEGORIES)?;

    let depense = crate::repo::honoraires::create_depense(&pool, &body).await?;
    crate::audit::log(&pool, &claims, "create", "depense", depense.id).await;
    Ok((StatusCode::CREATED, Json(depense)))
}

#[utoipa::path(
    get,
    path = "/api/affaires/{id}/depenses",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Expenses with their total", body = DepensesAffaire),
        (status = 404, description = "Affaire not found", body = AppError)
    ),
    tag = "depenses"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_affaire_depenses(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<DepensesAffaire>, AppError> {
    let affaire_id = ensure_affaire(&pool, &id).await?;
    let depenses = crate::repo::honoraires::list_depenses_by_affaire(&pool, affaire_id).await?;
    Ok(Json(DepensesAffaire::new(depenses)))
}

#[utoipa::path(
    put,
    path = "/api/depenses/{id}",
    params(("id" = String, Path, description = "Depense UUID")),
    request_body = UpdateDepenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = Depense),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "depenses"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_depense(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDepenseRequest>,
) -> Result<Json<Depense>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    if let Some(categorie) = body.categorie.as_deref() {
        check_vocab("categorie", categorie, DEPENSE_CATEGORIES)?;
    }

    let depense = crate::repo::honoraires::update_depense(&pool, uuid, &body)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Depense {} not found", id)))?;

    crate::audit::log(&pool, &claims, "update", "depense", uuid).await;
    Ok(Json(depense))
}

#[utoipa::path(
    delete,
    path = "/api/depenses/{id}",
    params(("id" = String, Path, description = "Depense UUID")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "depenses"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_depense(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::honoraires::delete_depense(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Depense {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "depense", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
