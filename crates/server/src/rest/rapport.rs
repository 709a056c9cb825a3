use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{Pool, Postgres};

use shared_types::{
    parse_periode_range, AppError, DepensesAffaire, DossierResponse, FactureResponse,
    HonorairesResponse,
};

use super::parse_uuid;
use crate::auth::extractors::AuthRequired;
use crate::repo::encaissement::EncaissementFilter;
use crate::typst::{
    compile_typst, facture_source, honoraires_source, periode_label,
    releve_encaissements_source, releve_recouvrement_source,
};

/// Month range of a building statement, `YYYY-MM` on both ends.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct RapportPeriodeParams {
    pub du: Option<String>,
    pub au: Option<String>,
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Compile a report and wrap it as an inline PDF response.
async fn pdf_response(source: String, filename: String) -> Result<impl IntoResponse, AppError> {
    let pdf_bytes = compile_typst(&source).await?;
    tracing::debug!(filename = %filename, bytes = pdf_bytes.len(), "report compiled");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        pdf_bytes,
    ))
}

/// GET /api/rapports/immeubles/{id}/encaissements
///
/// Management statement of a building over a month range (all months when
/// both bounds are omitted).
#[utoipa::path(
    get,
    path = "/api/rapports/immeubles/{id}/encaissements",
    params(
        ("id" = String, Path, description = "Immeuble UUID"),
        RapportPeriodeParams
    ),
    responses(
        (status = 200, description = "Rent statement", content_type = "application/pdf"),
        (status = 400, description = "Invalid period range", body = AppError),
        (status = 404, description = "Building not found", body = AppError)
    ),
    tag = "rapports"
)]
#[tracing::instrument(skip(pool))]
pub async fn releve_encaissements(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
    Query(params): Query<RapportPeriodeParams>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&id)?;
    let (du, au) = parse_periode_range(params.du.as_deref(), params.au.as_deref())
        .map_err(AppError::bad_request)?;

    let immeuble = crate::repo::immobilier::find_immeuble(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Immeuble {} not found", id)))?;
    let lignes = crate::repo::encaissement::list_details(
        &pool,
        &EncaissementFilter {
            immeuble_id: Some(uuid),
            du,
            au,
            ..Default::default()
        },
    )
    .await?;

    let source = releve_encaissements_source(
        crate::config::cabinet(),
        today(),
        &immeuble,
        &periode_label(du, au),
        &lignes,
    );
    pdf_response(source, format!("releve-{}.pdf", immeuble.reference)).await
}

/// GET /api/rapports/dossiers-recouvrement/{id}/releve
#[utoipa::path(
    get,
    path = "/api/rapports/dossiers-recouvrement/{id}/releve",
    params(("id" = String, Path, description = "Dossier UUID")),
    responses(
        (status = 200, description = "Debt-collection statement", content_type = "application/pdf"),
        (status = 404, description = "Dossier not found", body = AppError)
    ),
    tag = "rapports"
)]
#[tracing::instrument(skip(pool))]
pub async fn releve_recouvrement(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&id)?;
    let row = crate::repo::recouvrement::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Dossier {} not found", id)))?;
    let dossier = DossierResponse::from(row);
    let actions = crate::repo::recouvrement::list_actions(&pool, uuid).await?;
    let paiements = crate::repo::recouvrement::list_paiements(&pool, uuid).await?;

    let source = releve_recouvrement_source(
        crate::config::cabinet(),
        today(),
        &dossier,
        &actions,
        &paiements,
    );
    pdf_response(source, format!("{}.pdf", dossier.dossier.reference)).await
}

/// GET /api/rapports/factures/{id}
#[utoipa::path(
    get,
    path = "/api/rapports/factures/{id}",
    params(("id" = String, Path, description = "Facture UUID")),
    responses(
        (status = 200, description = "Printable invoice", content_type = "application/pdf"),
        (status = 404, description = "Invoice not found", body = AppError)
    ),
    tag = "rapports"
)]
#[tracing::instrument(skip(pool))]
pub async fn facture_pdf(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&id)?;
    let row = crate::repo::conseil::find_facture(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Facture {} not found", id)))?;
    let facture = FactureResponse::from(row);
    let client = crate::repo::conseil::find_client(&pool, facture.facture.client_id)
        .await?
        .ok_or_else(|| AppError::internal("Invoice without client"))?;
    let paiements = crate::repo::conseil::list_paiements(&pool, uuid).await?;

    let source = facture_source(
        crate::config::cabinet(),
        today(),
        &facture,
        &client,
        &paiements,
    );
    pdf_response(source, format!("{}.pdf", facture.facture.numero)).await
}

/// GET /api/rapports/affaires/{id}/honoraires
#[utoipa::path(
    get,
    path = "/api/rapports/affaires/{id}/honoraires",
    params(("id" = String, Path, description = "Affaire UUID")),
    responses(
        (status = 200, description = "Fee statement", content_type = "application/pdf"),
        (status = 404, description = "Affaire not found", body = AppError)
    ),
    tag = "rapports"
)]
#[tracing::instrument(skip(pool))]
pub async fn honoraires_affaire(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let uuid = parse_uuid(&id)?;
    let affaire = crate::repo::affaire::find_by_id(&pool, uuid)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Affaire {} not found", id)))?;

    let conventions: Vec<HonorairesResponse> = crate::repo::honoraires::list_by_affaire(&pool, uuid)
        .await?
        .into_iter()
        .map(HonorairesResponse::from)
        .collect();
    let paiements = crate::repo::honoraires::list_paiements_by_affaire(&pool, uuid).await?;
    let depenses =
        DepensesAffaire::new(crate::repo::honoraires::list_depenses_by_affaire(&pool, uuid).await?);

    let source = honoraires_source(
        crate::config::cabinet(),
        today(),
        &affaire,
        &conventions,
        &paiements,
        &depenses,
    );
    pdf_response(source, format!("honoraires-{}.pdf", affaire.reference)).await
}
