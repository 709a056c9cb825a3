use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AVenirParams, AppError, Audience, AudienceCalendrier, AudienceListParams, CalendrierParams,
    CreateAudienceRequest, CreateResultatRequest, PaginatedResponse, ResultatAudience,
    ResultatResponse, UpdateAudienceRequest, AUDIENCE_STATUTS,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COLLABORATEUR};
use crate::error_convert::{check_vocab, ValidateRequest};

fn audience_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Audience {} not found", id))
}

#[utoipa::path(
    post,
    path = "/api/audiences",
    request_body = CreateAudienceRequest,
    responses(
        (status = 201, description = "Hearing scheduled", body = Audience),
        (status = 400, description = "Unknown affaire or invalid status", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_audience(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Json(body): Json<CreateAudienceRequest>,
) -> Result<(StatusCode, Json<Audience>), AppError> {
    body.validate_request()?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, AUDIENCE_STATUTS)?;
    }

    let audience = crate::repo::audience::create(&pool, &body).await?;
    crate::audit::log(&pool, &claims, "create", "audience", audience.id).await;
    Ok((StatusCode::CREATED, Json(audience)))
}

#[utoipa::path(
    get,
    path = "/api/audiences",
    params(AudienceListParams),
    responses(
        (status = 200, description = "Paginated hearings", body = PaginatedResponse<Audience>)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_audiences(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<AudienceListParams>,
) -> Result<Json<PaginatedResponse<Audience>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, AUDIENCE_STATUTS)?;
    }
    if let (Some(du), Some(au)) = (params.du, params.au) {
        if du > au {
            return Err(AppError::bad_request("du must not be after au"));
        }
    }
    Ok(Json(crate::repo::audience::list(&pool, &params).await?))
}

/// GET /api/audiences/calendrier
#[utoipa::path(
    get,
    path = "/api/audiences/calendrier",
    params(CalendrierParams),
    responses(
        (status = 200, description = "Hearings in range with their affaire", body = Vec<AudienceCalendrier>),
        (status = 400, description = "Invalid range", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn calendrier(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<CalendrierParams>,
) -> Result<Json<Vec<AudienceCalendrier>>, AppError> {
    params.check().map_err(AppError::bad_request)?;
    Ok(Json(
        crate::repo::audience::calendrier(&pool, params.du, params.au).await?,
    ))
}

/// GET /api/audiences/a-venir
#[utoipa::path(
    get,
    path = "/api/audiences/a-venir",
    params(AVenirParams),
    responses(
        (status = 200, description = "Programmed hearings in the coming days", body = Vec<AudienceCalendrier>)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn a_venir(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<AVenirParams>,
) -> Result<Json<Vec<AudienceCalendrier>>, AppError> {
    Ok(Json(crate::repo::audience::a_venir(&pool, params.jours()).await?))
}

#[utoipa::path(
    get,
    path = "/api/affaires/{id}/audiences",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Hearings of the affaire, oldest first", body = Vec<Audience>),
        (status = 404, description = "Affaire not found", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_affaire_audiences(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<Audience>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::affaire::find_by_id(&pool, uuid).await?.is_none() {
        return Err(AppError::not_found(format!("Affaire {} not found", id)));
    }
    Ok(Json(crate::repo::audience::list_by_affaire(&pool, uuid).await?))
}

#[utoipa::path(
    get,
    path = "/api/audiences/{id}",
    params(("id" = String, Path, description = "Audience UUID")),
    responses(
        (status = 200, description = "Hearing found", body = Audience),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_audience(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Audience>, AppError> {
    let uuid = parse_uuid(&id)?;
    let audience = crate::repo::audience::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| audience_not_found(&id))?;
    Ok(Json(audience))
}

#[utoipa::path(
    put,
    path = "/api/audiences/{id}",
    params(("id" = String, Path, description = "Audience UUID")),
    request_body = UpdateAudienceRequest,
    responses(
        (status = 200, description = "Hearing updated", body = Audience),
        (status = 400, description = "Invalid status", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_audience(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAudienceRequest>,
) -> Result<Json<Audience>, AppError> {
    let uuid = parse_uuid(&id)?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, AUDIENCE_STATUTS)?;
    }
    if matches!(body.juridiction.as_deref(), Some(j) if j.trim().is_empty()) {
        return Err(AppError::invalid_field("juridiction", "Juridiction is required"));
    }
    if matches!(body.objet.as_deref(), Some(o) if o.trim().is_empty()) {
        return Err(AppError::invalid_field("objet", "Objet is required"));
    }

    let audience = crate::repo::audience::update(&pool, uuid, &body)
        .await?
        .ok_or_else(|| audience_not_found(&id))?;

    crate::audit::log(&pool, &claims, "update", "audience", uuid).await;
    Ok(Json(audience))
}

#[utoipa::path(
    delete,
    path = "/api/audiences/{id}",
    params(("id" = String, Path, description = "Audience UUID")),
    responses(
        (status = 204, description = "Hearing deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_audience(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::audience::delete(&pool, uuid).await? {
        return Err(audience_not_found(&id));
    }
    crate::audit::log(&pool, &claims, "delete", "audience", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

// ── Résultats ──────────────────────────────────────────

/// POST /api/audiences/{id}/resultat
///
/// A `renvoi` also schedules the follow-up hearing, returned alongside
/// the outcome.
#[utoipa::path(
    post,
    path = "/api/audiences/{id}/resultat",
    params(("id" = String, Path, description = "Audience UUID")),
    request_body = CreateResultatRequest,
    responses(
        (status = 201, description = "Outcome recorded", body = ResultatResponse),
        (status = 404, description = "Hearing not found", body = AppError),
        (status = 409, description = "Outcome already recorded", body = AppError),
        (status = 422, description = "Inconsistent outcome", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool, body), fields(type_resultat = %body.type_resultat))]
pub async fn create_resultat(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
    Json(body): Json<CreateResultatRequest>,
) -> Result<(StatusCode, Json<ResultatResponse>), AppError> {
    let uuid = parse_uuid(&id)?;

    let response = crate::repo::audience::create_resultat(&pool, uuid, &body).await?;

    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "resultat_audience",
        response.resultat.id,
        serde_json::json!({
            "audience_id": uuid,
            "type_resultat": body.type_resultat,
            "audience_suivante_id": response.audience_suivante.as_ref().map(|a| a.id),
        }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/audiences/{id}/resultat",
    params(("id" = String, Path, description = "Audience UUID")),
    responses(
        (status = 200, description = "Recorded outcome", body = ResultatAudience),
        (status = 404, description = "No outcome recorded", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_resultat(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<ResultatAudience>, AppError> {
    let uuid = parse_uuid(&id)?;
    let resultat = crate::repo::audience::find_resultat_by_audience(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("No outcome recorded for audience {}", id)))?;
    Ok(Json(resultat))
}

#[utoipa::path(
    delete,
    path = "/api/resultats/{id}",
    params(("id" = String, Path, description = "Outcome UUID")),
    responses(
        (status = 204, description = "Outcome removed, hearing back to programmee"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "audiences"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_resultat(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COLLABORATEUR>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::audience::delete_resultat(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Resultat {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "resultat_audience", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}
