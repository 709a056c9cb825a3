use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    check_identite_locataire, AppError, CreateLocataireRequest, Locataire, LocataireListParams,
    PaginatedResponse, UpdateLocataireRequest, LOCATAIRE_TYPES,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COLLABORATEUR};
use crate::error_convert::check_vocab;

fn locataire_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Locataire {} not found", id))
}

#[utoipa::path(
    post,
    path = "/api/locataires",
    request_body = CreateLocataireRequest,
    responses(
        (status = 201, description = "Tenant created", body = Locataire),
        (status = 422, description = "Missing nom or raison sociale", body = AppError)
    ),
    tag = "locataires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_locataire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateLocataireRequest>,
) -> Result<(StatusCode, Json<Locataire>), AppError> {
    check_vocab("type_locataire", &body.type_locataire, LOCATAIRE_TYPES)?;
    body.check()
        .map_err(|(field, message)| AppError::invalid_field(field, message))?;

    let locataire = crate::repo::immobilier::create_locataire(&pool, &body).await?;
    crate::search::index(&locataire);
    crate::audit::log(&pool, &claims, "create", "locataire", locataire.id).await;
    Ok((StatusCode::CREATED, Json(locataire)))
}

#[utoipa::path(
    get,
    path = "/api/locataires",
    params(LocataireListParams),
    responses(
        (status = 200, description = "Paginated tenants", body = PaginatedResponse<Locataire>)
    ),
    tag = "locataires"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_locataires(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<LocataireListParams>,
) -> Result<Json<PaginatedResponse<Locataire>>, AppError> {
    if let Some(t) = params.type_locataire.as_deref() {
        check_vocab("type_locataire", t, LOCATAIRE_TYPES)?;
    }
    Ok(Json(crate::repo::immobilier::list_locataires(&pool, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/locataires/{id}",
    params(("id" = String, Path, description = "Locataire UUID")),
    responses(
        (status = 200, description = "Tenant found", body = Locataire),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "locataires"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_locataire(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Locataire>, AppError> {
    let uuid = parse_uuid(&id)?;
    let locataire = crate::repo::immobilier::find_locataire(&pool, uuid)
        .await?
        .ok_or_else(|| locataire_not_found(&id))?;
    Ok(Json(locataire))
}

/// PUT /api/locataires/{id}
///
/// The identity rule is checked on the merged record, so switching to
/// `entreprise` needs a raison sociale in the same request or already stored.
#[utoipa::path(
    put,
    path = "/api/locataires/{id}",
    params(("id" = String, Path, description = "Locataire UUID")),
    request_body = UpdateLocataireRequest,
    responses(
        (status = 200, description = "Tenant updated", body = Locataire),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Missing nom or raison sociale", body = AppError)
    ),
    tag = "locataires"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_locataire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateLocataireRequest>,
) -> Result<Json<Locataire>, AppError> {
    let uuid = parse_uuid(&id)?;
    if let Some(t) = body.type_locataire.as_deref() {
        check_vocab("type_locataire", t, LOCATAIRE_TYPES)?;
    }

    let current = crate::repo::immobilier::find_locataire(&pool, uuid)
        .await?
        .ok_or_else(|| locataire_not_found(&id))?;
    check_identite_locataire(
        body.type_locataire.as_deref().unwrap_or(&current.type_locataire),
        body.nom.as_deref().or(current.nom.as_deref()),
        body.raison_sociale.as_deref().or(current.raison_sociale.as_deref()),
    )
    .map_err(|(field, message)| AppError::invalid_field(field, message))?;

    let locataire = crate::repo::immobilier::update_locataire(&pool, uuid, &body)
        .await?
        .ok_or_else(|| locataire_not_found(&id))?;

    crate::search::index(&locataire);
    crate::audit::log(&pool, &claims, "update", "locataire", uuid).await;
    Ok(Json(locataire))
}

#[utoipa::path(
    delete,
    path = "/api/locataires/{id}",
    params(("id" = String, Path, description = "Locataire UUID")),
    responses(
        (status = 204, description = "Tenant deleted, its lots released"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "locataires"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_locataire(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::immobilier::delete_locataire(&pool, uuid).await? {
        return Err(locataire_not_found(&id));
    }
    crate::search::unindex("locataire", uuid);
    crate::audit::log(&pool, &claims, "delete", "locataire", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
