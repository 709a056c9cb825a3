use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    AppError, ClientConseil, ClientConseilListParams, ConseilStatistiques,
    CreateClientConseilRequest, FactureListParams, FactureResponse, PaginatedResponse,
    UpdateClientConseilRequest, CLIENT_STATUTS, CLIENT_TYPES,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COMPTABLE, ROLE_GESTIONNAIRE};
use crate::error_convert::{check_vocab, ValidateRequest};

fn client_not_found(id: &str) -> AppError {
    AppError::not_found(format!("Client conseil {} not found", id))
}

#[utoipa::path(
    post,
    path = "/api/clients-conseil",
    request_body = CreateClientConseilRequest,
    responses(
        (status = 201, description = "Client registered", body = ClientConseil),
        (status = 400, description = "Invalid type or status", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn create_client(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Json(body): Json<CreateClientConseilRequest>,
) -> Result<(StatusCode, Json<ClientConseil>), AppError> {
    body.validate_request()?;
    check_vocab("type_client", &body.type_client, CLIENT_TYPES)?;
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, CLIENT_STATUTS)?;
    }

    let client = crate::repo::conseil::create_client(&pool, &body).await?;
    crate::search::index(&client);
    crate::audit::log_with(
        &pool,
        &claims,
        "create",
        "client_conseil",
        client.id,
        serde_json::json!({ "reference": client.reference }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    get,
    path = "/api/clients-conseil",
    params(ClientConseilListParams),
    responses(
        (status = 200, description = "Paginated advisory clients", body = PaginatedResponse<ClientConseil>)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_clients(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<ClientConseilListParams>,
) -> Result<Json<PaginatedResponse<ClientConseil>>, AppError> {
    if let Some(statut) = params.statut.as_deref() {
        check_vocab("statut", statut, CLIENT_STATUTS)?;
    }
    if let Some(t) = params.type_client.as_deref() {
        check_vocab("type_client", t, CLIENT_TYPES)?;
    }
    Ok(Json(crate::repo::conseil::list_clients(&pool, &params).await?))
}

/// GET /api/clients-conseil/statistiques
#[utoipa::path(
    get,
    path = "/api/clients-conseil/statistiques",
    responses(
        (status = 200, description = "Clients and invoicing totals", body = ConseilStatistiques)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool))]
pub async fn conseil_statistiques(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<ConseilStatistiques>, AppError> {
    let totaux = crate::repo::conseil::totaux(&pool).await?;
    Ok(Json(ConseilStatistiques::from(totaux)))
}

#[utoipa::path(
    get,
    path = "/api/clients-conseil/{id}",
    params(("id" = String, Path, description = "Client UUID")),
    responses(
        (status = 200, description = "Client found", body = ClientConseil),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_client(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<ClientConseil>, AppError> {
    let uuid = parse_uuid(&id)?;
    let client = crate::repo::conseil::find_client(&pool, uuid)
        .await?
        .ok_or_else(|| client_not_found(&id))?;
    Ok(Json(client))
}

#[utoipa::path(
    put,
    path = "/api/clients-conseil/{id}",
    params(("id" = String, Path, description = "Client UUID")),
    request_body = UpdateClientConseilRequest,
    responses(
        (status = 200, description = "Client updated", body = ClientConseil),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn update_client(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
    Json(body): Json<UpdateClientConseilRequest>,
) -> Result<Json<ClientConseil>, AppError> {
    let uuid = parse_uuid(&id)?;
    body.validate_request()?;
    if let Some(t) = body.type_client.as_deref() {
        check_vocab("type_client", t, CLIENT_TYPES)?;
    }
    if let Some(statut) = body.statut.as_deref() {
        check_vocab("statut", statut, CLIENT_STATUTS)?;
    }

    let client = crate::repo::conseil::update_client(&pool, uuid, &body)
        .await?
        .ok_or_else(|| client_not_found(&id))?;

    crate::search::index(&client);
    crate::audit::log(&pool, &claims, "update", "client_conseil", uuid).await;
    Ok(Json(client))
}

#[utoipa::path(
    delete,
    path = "/api/clients-conseil/{id}",
    params(("id" = String, Path, description = "Client UUID")),
    responses(
        (status = 204, description = "Client and its invoices deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_client(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_GESTIONNAIRE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;

    // Invoices go with the client; drop them from the index first.
    let factures = crate::repo::conseil::list_all_factures(
        &pool,
        &FactureListParams {
            client_id: Some(uuid),
            ..Default::default()
        },
    )
    .await?;

    if !crate::repo::conseil::delete_client(&pool, uuid).await? {
        return Err(client_not_found(&id));
    }

    for row in &factures {
        crate::search::unindex("facture", row.facture.id);
    }
    crate::search::unindex("client_conseil", uuid);
    crate::audit::log(&pool, &claims, "delete", "client_conseil", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/clients-conseil/{id}/factures",
    params(("id" = String, Path, description = "Client UUID")),
    responses(
        (status = 200, description = "Invoices of the client, latest first", body = Vec<FactureResponse>),
        (status = 404, description = "Client not found", body = AppError)
    ),
    tag = "conseil"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_client_factures(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Vec<FactureResponse>>, AppError> {
    let uuid = parse_uuid(&id)?;
    if crate::repo::conseil::find_client(&pool, uuid).await?.is_none() {
        return Err(client_not_found(&id));
    }

    let rows = crate::repo::conseil::list_all_factures(
        &pool,
        &FactureListParams {
            client_id: Some(uuid),
            ..Default::default()
        },
    )
    .await?;
    Ok(Json(rows.into_iter().map(FactureResponse::from).collect()))
}
