use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ActionRecouvrement, AppError, CreateActionRequest, CreateDossierRequest,
    CreatePaiementRequest, DossierListParams, DossierResponse, PaginatedResponse,
    PaiementRecouvrement, RecouvrementStatistiques, UpdateDossierRequest, UpdateStatutRequest,
    ACTION_TYPES, MODES_PAIEMENT, RECOUVREMENT_STATUTS,
};

use super::parse_uuid;
use crate::auth::extractors::{
    AuthRequired, RoleRequired, ROLE_COLLABORATEUR, ROLE_COMPTABLE, ROLE_GESTIONNAIRE,
};
use crate::error_convert::{check_vocab, ValidateRequest};

fn dossier_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Dossier de recouvrement {} not found", id))
}

async fn ensure_dossier(pool: &Pool<Postgres>, id: &str) -> Result<Uuid, AppError> {
    let uuid = parse_uuid(id)?;
    match crate::repo::recouvrement::find_by_id(pool, uuid).await? {
        Some(_) => Ok(uuid),
        None => Err(dossier_not_found(id)),
    }
}

// ── Dossiers ───────────────────────────────────────────

/// POST /api/dossiers-recouvrement
#[utoipa::path(
    post,
    path = "/api/dossiers-recouvrement",
    request_body = CreateDossierRequest,
    responses(
        (status = 201, description = "Dossier opened", body = DossierResponse),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_dossier(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateDossierRequest>,
) -> Result<(StatusCode, Json<DossierResponse>), AppError> {
    body.validate_request()?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, RECOUVREMENT_STATUTS)?;
    }

    let row = crate::repo::recouvrement::create(&pool, &body).await?;
    crate::search::index(&row.dossier);
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "dossier_recouvrement",
        row.dossier.id,
        serde_json::json!({ "reference": row.dossier.reference }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DossierResponse::from(row))))
}

/// GET /api/dossiers-recouvrement
#[utoipa::path(
    get,
    path = "/api/dossiers-recouvrement",
    params(DossierListParams),
    responses(
        (status = 200, description = "Paginated dossiers with their situation", body = PaginatedResponse<DossierResponse>)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_dossiers(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<DossierListParams>,
) -> Result<Json<PaginatedResponse<DossierResponse>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, RECOUVREMENT_STATUTS)?;
    }
    let page = crate::repo::recouvrement::list(&pool, &params).await?;
    Ok(Json(page.map(DossierResponse::from)))
}

#[utoipa::path(
    get,
    path = "/api/dossiers-recouvrement/statistiques",
    responses(
        (status = 200, description = "Portfolio figures", body = RecouvrementStatistiques)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn recouvrement_statistiques(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<RecouvrementStatistiques>, AppError> {
    Ok(Json(crate::repo::recouvrement::statistiques(&pool).await?))
}

#[utoipa::path(
    get,
    path = "/api/dossiers-recouvrement/{id}",
    params(("id" = String, Path, description = "Dossier UUID")),
    responses(
        (status = 200, description = "Dossier with its situation", body = DossierResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_dossier(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<DossierResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    let row = crate::repo::recouvrement::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| dossier_not_found(&id))?;
    Ok(Json(DossierResponse::from(row)))
}

#[utoipa::path(
    put,
    path = "/api/dossiers-recouvrement/{id}",
    params(("id" = String, Path, description = "Dossier UUID")),
    request_body = UpdateDossierRequest,
    responses(
        (status = 200, description = "Dossier updated", body = DossierResponse),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_dossier(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDossierRequest>,
) -> Result<Json<DossierResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;

    let row = crate::repo::recouvrement::update(&pool, uuid, &body)
        .await?
        .ok_or_else(|| dossier_not_found(&id))?;

    crate::search::index(&row.dossier);
    crate::audit::log(&pool, &claims, "update", "dossier_recouvrement", uuid).await;
    Ok(Json(DossierResponse::from(row)))
}

/// PATCH /api/dossiers-recouvrement/{id}/statut
#[utoipa::path(
    patch,
    path = "/api/dossiers-recouvrement/{id}/statut",
    params(("id" = String, Path, description = "Dossier UUID")),
    request_body = UpdateStatutRequest,
    responses(
        (status = 200, description = "Status changed", body = DossierResponse),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_dossier_statut(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatutRequest>,
) -> Result<Json<DossierResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    check_vocab("statut", &body.statut, RECOUVREMENT_STATUTS)?;

    let row = crate::repo::recouvrement::update_statut(&pool, uuid, &body.statut)
        .await?
        .ok_or_else(|| dossier_not_found(&id))?;

    crate::search::index(&row.dossier);
    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "dossier_recouvrement",
        uuid,
        serde_json::json!({ "statut": body.statut }),
    )
    .await;
    Ok(Json(DossierResponse::from(row)))
}

#[utoipa::path(
    delete,
    path = "/api/dossiers-recouvrement/{id}",
    params(("id" = String, Path, description = "Dossier UUID")),
    responses(
        (status = 204, description = "Dossier, actions and payments deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_dossier(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_GESTIONNAIRE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::recouvrement::delete(&pool, uuid).await? {
        return Err(dossier_not_found(&id));
    }
    crate::search::unindex("dossier_recouvrement", uuid);
    crate::audit::log(&pool, &claims, "delete", "dossier_recouvrement", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Actions ────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/dossiers-recouvrement/{id}/actions",
    params(("id" = String, Path, description = "Dossier UUID")),
    request_body = CreateActionRequest,
    responses(
        (status = 201, description = "Action logged", body = ActionRecouvrement),
        (status = 404, description = "Dossier not found", body = AppError),
        (status = 409, description = "Dossier closed", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool, body), fields(type_action = %body.type_action))]
pub async fn create_action(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<CreateActionRequest>,
) -> Result<(StatusCode, Json<ActionRecouvrement>), AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    check_vocab("type_action", &body.type_action, ACTION_TYPES)?;

    let action = crate::repo::recouvrement::create_action(&pool, uuid, &body)
        .await?
        .ok_or_else(|| dossier_not_found(&id))?;

    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "action_recouvrement",
        action.id,
        serde_json::json!({ "dossier_id": uuid, "type_action": action.type_action }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(action)))
}

#[utoipa::path(
    get,
    path = "/api/dossiers-recouvrement/{id}/actions",
    params(("id" = String, Path, description = "Dossier UUID")),
    responses(
        (status = 200, description = "Actions in chronological order", body = Vec<ActionRecouvrement>),
        (status = 404, description = "Dossier not found", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_actions(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<ActionRecouvrement>>, AppError> {
    let uuid = ensure_dossier(&pool, &id).await?;
    Ok(Json(crate::repo::recouvrement::list_actions(&pool, uuid).await?))
}

#[utoipa::path(
    delete,
    path = "/api/actions-recouvrement/{id}",
    params(("id" = String, Path, description = "Action UUID")),
    responses(
        (status = 204, description = "Action deleted"),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Dossier closed", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_action(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::recouvrement::delete_action(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Action {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "action_recouvrement", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Payments ───────────────────────────────────────────

/// POST /api/dossiers-recouvrement/{id}/paiements
///
/// A payment that settles the balance moves the dossier to `solde`.
#[utoipa::path(
    post,
    path = "/api/dossiers-recouvrement/{id}/paiements",
    params(("id" = String, Path, description = "Dossier UUID")),
    request_body = CreatePaiementRequest,
    responses(
        (status = 201, description = "Payment recorded", body = PaiementRecouvrement),
        (status = 400, description = "Amount exceeds the balance", body = AppError),
        (status = 404, description = "Dossier not found", body = AppError),
        (status = 409, description = "Dossier closed", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool, body), fields(montant = body.montant))]
pub async fn create_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<CreatePaiementRequest>,
) -> Result<(StatusCode, Json<PaiementRecouvrement>), AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    check_vocab("mode_paiement", &body.mode_paiement, MODES_PAIEMENT)?;

    let paiement = crate::repo::recouvrement::create_paiement(&pool, uuid, &body)
        .await?
        .ok_or_else(|| dossier_not_found(&id))?;

    if let Some(row) = crate::repo::recouvrement::find_by_id(&pool, uuid).await? {
        crate::search::index(&row.dossier);
    }
    crate::audit::log_with(
        &pool,
        &claims,
        "payment",
        "dossier_recouvrement",
        uuid,
        serde_json::json!({ "paiement_id": paiement.id, "montant": paiement.montant }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(paiement)))
}

#[utoipa::path(
    get,
    path = "/api/dossiers-recouvrement/{id}/paiements",
    params(("id" = String, Path, description = "Dossier UUID")),
    responses(
        (status = 200, description = "Payments, oldest first", body = Vec<PaiementRecouvrement>),
        (status = 404, description = "Dossier not found", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_paiements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaiementRecouvrement>>, AppError> {
    let uuid = ensure_dossier(&pool, &id).await?;
    Ok(Json(crate::repo::recouvrement::list_paiements(&pool, uuid).await?))
}

#[utoipa::path(
    delete,
    path = "/api/paiements-recouvrement/{id}",
    params(("id" = String, Path, description = "Payment UUID")),
    responses(
        (status = 204, description = "Payment deleted"),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Dossier closed", body = AppError)
    ),
    tag = "recouvrement"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_paiement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::recouvrement::delete_paiement(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Paiement {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "paiement_recouvrement", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
