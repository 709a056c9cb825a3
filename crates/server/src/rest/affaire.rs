use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AffaireListParams, AffaireResponse, AffaireStatistiques, AffaireSynthese, AppError,
    CreateAffaireRequest, PaginatedResponse, UpdateAffaireRequest, UpdateStatutRequest,
    AFFAIRE_NATURES, AFFAIRE_STATUTS,
};

use super::parse_uuid;
use crate::auth::extractors::{
    AuthRequired, RoleRequired, ROLE_COLLABORATEUR, ROLE_GESTIONNAIRE,
};
use crate::error_convert::{check_vocab, ValidateRequest};

fn affaire_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Affaire {} not found", id))
}

/// POST /api/affaires
#[utoipa::path(
    post,
    path = "/api/affaires",
    request_body = CreateAffaireRequest,
    responses(
        (status = 201, description = "Affaire opened", body = AffaireResponse),
        (status = 400, description = "Invalid request", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_affaire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateAffaireRequest>,
) -> Result<(StatusCode, Json<AffaireResponse>), AppError> {
    body.validate_request()?;
    check_vocab("nature", &body.nature, AFFAIRE_NATURES)?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, AFFAIRE_STATUTS)?;
    }

    let affaire = crate::repo::affaire::create(&pool, &body).await?;
    crate::search::index(&affaire);
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "affaire",
        affaire.id,
        serde_json::json!({ "reference": affaire.reference }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(AffaireResponse::from(affaire))))
}

/// GET /api/affaires
#[utoipa::path(
    get,
    path = "/api/affaires",
    params(AffaireListParams),
    responses(
        (status = 200, description = "Paginated affaires", body = PaginatedResponse<AffaireResponse>)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_affaires(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<AffaireListParams>,
) -> Result<Json<PaginatedResponse<AffaireResponse>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, AFFAIRE_STATUTS)?;
    }
    if let Some(nature) = params.nature.as_deref() {
        check_vocab("nature", nature, AFFAIRE_NATURES)?;
    }
    Ok(Json(crate::repo::affaire::list(&pool, &params).await?))
}

/// GET /api/affaires/statistiques
#[utoipa::path(
    get,
    path = "/api/affaires/statistiques",
    responses(
        (status = 200, description = "Counts by status and nature", body = AffaireStatistiques)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn affaire_statistiques(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<AffaireStatistiques>, AppError> {
    Ok(Json(crate::repo::affaire::statistiques(&pool).await?))
}

/// GET /api/affaires/{id}
#[utoipa::path(
    get,
    path = "/api/affaires/{id}",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Affaire found", body = AffaireResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_affaire(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<AffaireResponse>, AppError> {
    let uuid = parse_uuid(&id)?;

    let affaire = crate::repo::affaire::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| affaire_not_found(&id))?;

    Ok(Json(AffaireResponse::from(affaire)))
}

/// GET /api/affaires/{id}/synthese
#[utoipa::path(
    get,
    path = "/api/affaires/{id}/synthese",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Fees, expenses and hearings summary", body = AffaireSynthese),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn affaire_synthese(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<AffaireSynthese>, AppError> {
    let uuid = parse_uuid(&id)?;

    let synthese = crate::repo::affaire::synthese(&pool, uuid)
        .await?
        .ok_or_else(|| affaire_not_found(&id))?;

    Ok(Json(synthese))
}

/// PUT /api/affaires/{id}
#[utoipa::path(
    put,
    path = "/api/affaires/{id}",
    params(("id" = String, Path, description = "Affaire UUID")),
    request_body = UpdateAffaireRequest,
    responses(
        (status = 200, description = "Affaire updated", body = AffaireResponse),
        (status = 400, description = "Invalid request", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_affaire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAffaireRequest>,
) -> Result<Json<AffaireResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    if let Some(nature) = body.nature.as_deref() {
        check_vocab("nature", nature, AFFAIRE_NATURES)?;
    }

    let affaire = crate::repo::affaire::update(&pool, uuid, &body)
        .await?
        .ok_or_else(|| affaire_not_found(&id))?;

    crate::search::index(&affaire);
    crate::audit::log(&pool, &claims, "update", "affaire", uuid).await;
    Ok(Json(AffaireResponse::from(affaire)))
}

/// PATCH /api/affaires/{id}/statut
#[utoipa::path(
    patch,
    path = "/api/affaires/{id}/statut",
    params(("id" = String, Path, description = "Affaire UUID")),
    request_body = UpdateStatutRequest,
    responses(
        (status = 200, description = "Status changed", body = AffaireResponse),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_affaire_statut(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatutRequest>,
) -> Result<Json<AffaireResponse>, AppError> {
    let uuid = parse_uuid(&id)?;
    check_vocab("statut", &body.statut, AFFAIRE_STATUTS)?;

    let affaire = crate::repo::affaire::update_statut(&pool, uuid, &body.statut)
        .await?
        .ok_or_else(|| affaire_not_found(&id))?;

    crate::search::index(&affaire);
    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "affaire",
        uuid,
        serde_json::json!({ "statut": body.statut }),
    )
    .await;
    Ok(Json(AffaireResponse::from(affaire)))
}

/// DELETE /api/affaires/{id}
#[utoipa::path(
    delete,
    path = "/api/affaires/{id}",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 204, description = "Affaire and its hearings, fees and expenses deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "affaires"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_affaire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_GESTIONNAIRE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;

    if !crate::repo::affaire::delete(&pool, uuid).await? {
        return Err(affaire_not_found(&id));
    }

    crate::search::unindex("affaire", uuid);
    crate::audit::log(&pool, &claims, "delete", "affaire", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
