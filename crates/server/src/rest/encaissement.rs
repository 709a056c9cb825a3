use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{
    parse_periode, parse_periode_range, AppError, CreateEncaissementRequest, Encaissement,
    EncaissementListParams, ImpayeLoyer, ImpayesParams, PaginatedResponse,
    SyntheseEncaissements, SyntheseParams, MODES_PAIEMENT,
};

use super::parse_uuid;
use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_COMPTABLE};
use crate::error_convert::{check_vocab, ValidateRequest};
use crate::repo::encaissement::EncaissementFilter;

/// Turn list query params into a repository filter, parsing the periods.
pub(crate) fn filter_from_params(params: &EncaissementListParams) -> Result<EncaissementFilter, AppError> {
    let (du, au) = parse_periode_range(params.du.as_deref(), params.au.as_deref())
        .map_err(AppError::bad_request)?;
    Ok(EncaissementFilter {
        lot_id: params.lot_id,
        immeuble_id: params.immeuble_id,
        du,
        au,
    })
}

/// POST /api/encaissements
///
/// The CAPCO commission is taken at the building's current rate.
#[utoipa::path(
    post,
    path = "/api/encaissements",
    request_body = CreateEncaissementRequest,
    responses(
        (status = 201, description = "Rent collection recorded", body = Encaissement),
        (status = 400, description = "Unknown lot or payment mode", body = AppError),
        (status = 422, description = "Invalid period or amount", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool, body), fields(lot_id = %body.lot_id, montant = body.montant))]
pub async fn create_encaissement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Json(body): Json<CreateEncaissementRequest>,
) -> Result<(StatusCode, Json<Encaissement>), AppError> {
    body.validate_request()?;
    check_vocab("mode_paiement", &body.mode_paiement, MODES_PAIEMENT)?;
    let periode =
        parse_periode(&body.periode).map_err(|msg| AppError::invalid_field("periode", msg))?;

    let encaissement = crate::repo::encaissement::create(&pool, &body, periode).await?;

    crate::audit::log_with(
        &pool,
        &claims,
        "payment",
        "encaissement",
        encaissement.id,
        serde_json::json!({
            "lot_id": encaissement.lot_id,
            "periode": body.periode,
            "montant": encaissement.montant,
            "commission_capco": encaissement.commission_capco,
        }),
    )
    .await;
    Ok((StatusCode::CREATED, Json(encaissement)))
}

#[utoipa::path(
    get,
    path = "/api/encaissements",
    params(EncaissementListParams),
    responses(
        (status = 200, description = "Paginated rent collections", body = PaginatedResponse<Encaissement>),
        (status = 400, description = "Invalid period range", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_encaissements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<EncaissementListParams>,
) -> Result<Json<PaginatedResponse<Encaissement>>, AppError> {
    let filter = filter_from_params(&params)?;
    Ok(Json(
        crate::repo::encaissement::list(&pool, &filter, params.page, params.limit).await?,
    ))
}

/// GET /api/encaissements/impayes
#[utoipa::path(
    get,
    path = "/api/encaissements/impayes",
    params(ImpayesParams),
    responses(
        (status = 200, description = "Occupied lots not fully paid for the month", body = Vec<ImpayeLoyer>),
        (status = 400, description = "Invalid period", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool))]
pub async fn impayes(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<ImpayesParams>,
) -> Result<Json<Vec<ImpayeLoyer>>, AppError> {
    let periode = parse_periode(&params.periode).map_err(AppError::bad_request)?;
    let rows = crate::repo::encaissement::impayes(&pool, periode, params.immeuble_id).await?;
    Ok(Json(rows.into_iter().map(ImpayeLoyer::from).collect()))
}

/// GET /api/encaissements/synthese
#[utoipa::path(
    get,
    path = "/api/encaissements/synthese",
    params(SyntheseParams),
    responses(
        (status = 200, description = "Collected, commission and net totals per month", body = SyntheseEncaissements),
        (status = 400, description = "Invalid period range", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool))]
pub async fn synthese(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Query(params): Query<SyntheseParams>,
) -> Result<Json<SyntheseEncaissements>, AppError> {
    let (du, au) = match parse_periode_range(Some(&params.du), Some(&params.au))
        .map_err(AppError::bad_request)?
    {
        (Some(du), Some(au)) => (du, au),
        _ => return Err(AppError::bad_request("du and au are required")),
    };

    let mois = crate::repo::encaissement::synthese(&pool, du, au, params.immeuble_id).await?;
    Ok(Json(SyntheseEncaissements::from_mois(mois)))
}

#[utoipa::path(
    get,
    path = "/api/encaissements/{id}",
    params(("id" = String, Path, description = "Encaissement UUID")),
    responses(
        (status = 200, description = "Rent collection", body = Encaissement),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_encaissement(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<Json<Encaissement>, AppError> {
    let uuid = parse_uuid(&id)?;
    let encaissement = crate::repo::encaissement::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Encaissement {} not found", id)))?;
    Ok(Json(encaissement))
}

#[utoipa::path(
    delete,
    path = "/api/encaissements/{id}",
    params(("id" = String, Path, description = "Encaissement UUID")),
    responses(
        (status = 204, description = "Rent collection deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "encaissements"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_encaissement(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_COMPTABLE>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uuid = parse_uuid(&id)?;
    if !crate::repo::encaissement::delete(&pool, uuid).await? {
        return Err(AppError::not_found(format!("Encaissement {} not found", id)));
    }
    crate::audit::log(&pool, &claims, "delete", "encaissement", uuid).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params(du: Option<&str>, au: Option<&str>) -> EncaissementListParams {
        EncaissementListParams {
            du: du.map(str::to_string),
            au: au.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn filter_parses_periods_to_first_of_month() {
        let filter = filter_from_params(&params(Some("2025-01"), Some("2025-03"))).unwrap();
        assert_eq!(filter.du, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.au, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn filter_rejects_bad_periods() {
        let err = filter_from_params(&params(Some("2025-1"), None)).unwrap_err();
        assert_eq!(err.status_code_u16(), 400);

        let err = filter_from_params(&params(Some("2025-06"), Some("2025-01"))).unwrap_err();
        assert_eq!(err.status_code_u16(), 400);
    }

    #[test]
    fn empty_filter_is_unbounded() {
        let filter = filter_from_params(&EncaissementListParams::default()).unwrap();
        assert!(filter.du.is_none() && filter.au.is_none());
        assert!(filter.lot_id.is_none());
    }
}
