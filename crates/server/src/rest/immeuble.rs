use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AppError, CreateImmeubleRequest, Immeuble, ImmeubleListParams, Lot, OccupationStatistiques,
    PaginatedResponse, UpdateImmeubleRequest,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COLLABORATEUR, ROLE_GESTIONNAIRE};
use crate::error_convert::ValidateRequest;

fn immeuble_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Immeuble {} not found", id))
}

/// POST /api/immeubles
///
/// Without a `taux_commission` the building takes the configured default rate.
#[utoipa::path(
    post,
    path = "/api/immeubles",
    request_body = CreateImmeubleRequest,
    responses(
        (status = 201, description = "Building registered", body = Immeuble),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_immeuble(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateImmeubleRequest>,
) -> Result<(StatusCode, Json<Immeuble>), AppError> {
    body.validate_request()?;

    let taux_defaut = crate::config::cabinet().taux_commission_defaut;
    let immeuble = crate::repo::immobilier::create_immeuble(&pool, &body, taux_defaut).await?;

    crate::search::index(&immeuble);
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "immeuble",
        immeuble.id,
        serde_json::json!({ "reference": immeuble.reference }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(immeuble)))
}

#[utoipa::path(
    get,
    path = "/api/immeubles",
    params(ImmeubleListParams),
    responses(
        (status = 200, description = "Paginated buildings", body = PaginatedResponse<Immeuble>)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_immeubles(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<ImmeubleListParams>,
) -> Result<Json<PaginatedResponse<Immeuble>>, AppError> {
    Ok(Json(crate::repo::immobilier::list_immeubles(&pool, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/immeubles/{id}",
    params(("id" = String, Path, description = "Immeuble UUID")),
    responses(
        (status = 200, description = "Building found", body = Immeuble),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_immeuble(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Immeuble>, AppError> {
    let uuid = parse_uuid(&id)?;
    let immeuble = crate::repo::immobilier::find_immeuble(&pool, uuid)
        .await?
        .ok_or_else(|| immeuble_not_found(&id))?;
    Ok(Json(immeuble))
}

#[utoipa::path(
    put,
    path = "/api/immeubles/{id}",
    params(("id" = String, Path, description = "Immeuble UUID")),
    request_body = UpdateImmeubleRequest,
    responses(
        (status = 200, description = "Building updated", body = Immeuble),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_immeuble(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateImmeubleRequest>,
) -> Result<Json<Immeuble>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;

    let immeuble = crate::repo::immobilier::update_immeuble(&pool, uuid, &body)
        .await?
        .ok_or_else(|| immeuble_not_found(&id))?;

    crate::search::index(&immeuble);
    crate::audit::log(&pool, &claims, "update", "immeuble", uuid).await;
    Ok(Json(immeuble))
}

#[utoipa::path(
    delete,
    path = "/api/immeubles/{id}",
    params(("id" = String, Path, description = "Immeuble UUID")),
    responses(
        (status = 204, description = "Building, its lots and their collections deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_immeuble(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_GESTIONNAIRE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::immobilier::delete_immeuble(&pool, uuid).await? {
        return Err(immeuble_not_found(&id));
    }
    crate::search::unindex("immeuble", uuid);
    crate::audit::log(&pool, &claims, "delete", "immeuble", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/immeubles/{id}/lots",
    params(("id" = String, Path, description = "Immeuble UUID")),
    responses(
        (status = 200, description = "Lots of the building", body = Vec<Lot>),
        (status = 404, description = "Building not found", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_immeuble_lots(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<Lot>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::immobilier::find_immeuble(&pool, uuid).await?.is_none() {
        return Err(immeuble_not_found(&id));
    }
    Ok(Json(crate::repo::immobilier::list_lots_by_immeuble(&pool, uuid).await?))
}

#[utoipa::path(
    get,
    path = "/api/immeubles/{id}/statistiques",
    params(("id" = String, Path, description = "Immeuble UUID")),
    responses(
        (status = 200, description = "Occupancy and rent roll of the building", body = OccupationStatistiques),
        (status = 404, description = "Building not found", body = AppError)
    ),
    tag = "immeubles"
)]
#[tracing::instrument(skip(pool))]
pub async fn immeuble_statistiques(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<OccupationStatistiques>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::immobilier::find_immeuble(&pool, uuid).await?.is_none() {
        return Err(immeuble_not_found(&id));
    }
    let counts = crate::repo::immobilier::lot_counts(&pool, Some(uuid)).await?;
    Ok(Json(OccupationStatistiques::from(counts)))
}
