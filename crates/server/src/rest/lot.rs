use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AppError, AssignLocataireRequest, CreateLotRequest, Encaissement, Lot, LotListParams,
    OccupationStatistiques, PaginatedResponse, UpdateLotRequest, LOT_STATUTS, LOT_TYPES,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COLLABORATEUR};
use crate::error_convert::{check_vocab, ValidateRequest};

fn lot_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Lot {} not found", id))
}

#[utoipa::path(
    post,
    path = "/api/lots",
    request_body = CreateLotRequest,
    responses(
        (status = 201, description = "Lot created", body = Lot),
        (status = 400, description = "Unknown building or invalid type", body = AppError),
        (status = 409, description = "Numero already used in this building", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_lot(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateLotRequest>,
) -> Result<(StatusCode, Json<Lot>), AppError> {
    body.validate_request()?;
    check_vocab("type_lot", &body.type_lot, LOT_TYPES)?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, LOT_STATUTS)?;
        if statut == "occupe" {
            return Err(AppError::invalid_field(
                "statut",
                "Assign a tenant to mark a lot as occupe",
            ));
        }
    }

    let lot = crate::repo::immobilier::create_lot(&pool, &body).await?;
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "lot",
        lot.id,
        serde_json::json!({ "immeuble_id": lot.immeuble_id, "numero": lot.numero }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(lot)))
}

#[utoipa::path(
    get,
    path = "/api/lots",
    params(LotListParams),
    responses(
        (status = 200, description = "Paginated lots", body = PaginatedResponse<Lot>)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_lots(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<LotListParams>,
) -> Result<Json<PaginatedResponse<Lot>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, LOT_STATUTS)?;
    }
    if let Some(type_lot) = params.type_lot.as_deref() {
        check_vocab("type_lot", type_lot, LOT_TYPES)?;
    }
    Ok(Json(crate::repo::immobilier::list_lots(&pool, &params).await?))
}

/// GET /api/lots/statistiques
#[utoipa::path(
    get,
    path = "/api/lots/statistiques",
    responses(
        (status = 200, description = "Occupancy across every building", body = OccupationStatistiques)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn lot_statistiques(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<OccupationStatistiques>, AppError> {
    let counts = crate::repo::immobilier::lot_counts(&pool, None).await?;
    Ok(Json(OccupationStatistiques::from(counts)))
}

#[utoipa::path(
    get,
    path = "/api/lots/{id}",
    params(("id" = String, Path, description = "Lot UUID")),
    responses(
        (status = 200, description = "Lot found", body = Lot),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_lot(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Lot>, AppError> {
    let uuid = parse_uuid(&id)?;
    let lot = crate::repo::immobilier::find_lot(&pool, uuid)
        .await?
        .ok_or_else(|| lot_not_found(&id))?;
    Ok(Json(lot))
}

#[utoipa::path(
    put,
    path = "/api/lots/{id}",
    params(("id" = String, Path, description = "Lot UUID")),
    request_body = UpdateLotRequest,
    responses(
        (status = 200, description = "Lot updated", body = Lot),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Status change on a let lot or duplicate numero", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_lot(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateLotRequest>,
) -> Result<Json<Lot>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    if let Some(type_lot) = body.type_lot.as_deref() {
        check_vocab("type_lot", type_lot, LOT_TYPES)?;
    }
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, LOT_STATUTS)?;
    }

    let lot = crate::repo::immobilier::update_lot(&pool, uuid, &body)
        .await?
        .ok_or_else(|| lot_not_found(&id))?;

    crate::audit::log(&pool, &claims, "update", "lot", uuid).await;
    Ok(Json(lot))
}

/// PATCH /api/lots/{id}/locataire
///
/// A tenant id lets the lot (`occupe`); `null` releases it.
#[utoipa::path(
    patch,
    path = "/api/lots/{id}/locataire",
    params(("id" = String, Path, description = "Lot UUID")),
    request_body = AssignLocataireRequest,
    responses(
        (status = 200, description = "Tenant assigned or released", body = Lot),
        (status = 400, description = "Unknown tenant", body = AppError),
        (status = 404, description = "Lot not found", body = AppError),
        (status = 409, description = "Lot under works", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn assign_locataire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<AssignLocataireRequest>,
) -> Result<Json<Lot>, AppError> {
    let uuid = parse_uuid(&id)?;
    if let Some(locataire_id) = body.locataire_id {
        if crate::repo::immobilier::find_locataire(&pool, locataire_id).await?.is_none() {
            return Err(AppError::invalid_field(
                "locataire_id",
                format!("Locataire {} not found", locataire_id),
            ));
        }
    }

    let lot = crate::repo::immobilier::assign_locataire(&pool, uuid, &body)
        .await?
        .ok_or_else(|| lot_not_found(&id))?;

    crate::audit::log_with(
        &pool,
        &claims,
        "status",
        "lot",
        uuid,
        serde_json::json!({ "locataire_id": body.locataire_id, "statut": lot.statut }),
    )
    .await;
    Ok(Json(lot))
}

#[utoipa::path(
    delete,
    path = "/api/lots/{id}",
    params(("id" = String, Path, description = "Lot UUID")),
    responses(
        (status = 204, description = "Lot and its collections deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_lot(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::immobilier::delete_lot(&pool, uuid).await? {
        return Err(lot_not_found(&id));
    }
    crate::audit::log(&pool, &claims, "delete", "lot", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/lots/{id}/encaissements",
    params(("id" = String, Path, description = "Lot UUID")),
    responses(
        (status = 200, description = "Rent collections of the lot, latest period first", body = Vec<Encaissement>),
        (status = 404, description = "Lot not found", body = AppError)
    ),
    tag = "lots"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_lot_encaissements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<Encaissement>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::immobilier::find_lot(&pool, uuid).await?.is_none() {
        return Err(lot_not_found(&id));
    }
    Ok(Json(crate::repo::encaissement::list_by_lot(&pool, uuid).await?))
}
