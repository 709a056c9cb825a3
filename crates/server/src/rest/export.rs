use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    AppError, DossierResponse, FactureResponse, ImportErreur, ImportParams, ImportReport,
    ReferenceKind,
};

use crate::auth::extractors::{AuthRequired, RoleRequired, ROLE_GESTIONNAIRE};
use crate::error_convert::SqlxErrorExt;
use crate::repo::encaissement::EncaissementFilter;
use crate::spreadsheet::{self, CsvTable, ExportEntite, ImportEntite, LotImport};

fn entite_not_found(entite: &str) -> AppError {
    AppError::not_found(format!("Unknown entity {}", entite))
}

/// Prefix a row-level failure with its line so a rolled-back import points
/// at the culprit.
fn at_line(ligne: usize, err: AppError) -> AppError {
    AppError {
        message: format!("Line {}: {}", ligne, err.message),
        ..err
    }
}

/// GET /api/exports/{entite}
#[utoipa::path(
    get,
    path = "/api/exports/{entite}",
    params(("entite" = String, Path, description = "affaires, dossiers-recouvrement, lots, locataires, encaissements, clients-conseil or factures")),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 404, description = "Unknown entity", body = AppError)
    ),
    tag = "exports"
)]
#[tracing::instrument(skip(pool))]
pub async fn export(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
    Path(entite): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = ExportEntite::from_slug(&entite).ok_or_else(|| entite_not_found(&entite))?;
    let headers = kind.headers();

    let records: Vec<Vec<String>> = match kind {
        ExportEntite::Affaires => crate::repo::affaire::list_all(&pool, &Default::default())
            .await?
            .iter()
            .map(spreadsheet::affaire_record)
            .collect(),
        ExportEntite::DossiersRecouvrement => {
            crate::repo::recouvrement::list_all(&pool, &Default::default())
                .await?
                .into_iter()
                .map(|row| spreadsheet::dossier_record(&DossierResponse::from(row)))
                .collect()
        }
        ExportEntite::Lots => {
            let references: HashMap<Uuid, String> =
                crate::repo::immobilier::list_all_immeubles(&pool)
                    .await?
                    .into_iter()
                    .map(|i| (i.id, i.reference))
                    .collect();
            crate::repo::immobilier::list_all_lots(&pool, &Default::default())
                .await?
                .iter()
                .map(|lot| {
                    let reference = references
                        .get(&lot.immeuble_id)
                        .map(String::as_str)
                        .unwrap_or_default();
                    spreadsheet::lot_record(lot, reference)
                })
                .collect()
        }
        ExportEntite::Locataires => {
            crate::repo::immobilier::list_all_locataires(&pool, &Default::default())
                .await?
                .iter()
                .map(spreadsheet::locataire_record)
                .collect()
        }
        ExportEntite::Encaissements => {
            crate::repo::encaissement::list_details(&pool, &EncaissementFilter::default())
                .await?
                .iter()
                .map(spreadsheet::encaissement_record)
                .collect()
        }
        ExportEntite::ClientsConseil => {
            crate::repo::conseil::list_all_clients(&pool, &Default::default())
                .await?
                .iter()
                .map(spreadsheet::client_record)
                .collect()
        }
        ExportEntite::Factures => crate::repo::conseil::list_all_factures(&pool, &Default::default())
            .await?
            .into_iter()
            .map(|row| spreadsheet::facture_record(&FactureResponse::from(row)))
            .collect(),
    };

    tracing::info!(entite = %entite, rows = records.len(), "CSV export");
    let bytes = spreadsheet::write_csv(headers, records)?;
    let filename = format!(
        "{}-{}.csv",
        entite,
        chrono::Utc::now().date_naive().format("%Y%m%d")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}

/// Rows that passed validation, ready to insert.
enum Valides {
    Locataires(Vec<(usize, shared_types::CreateLocataireRequest)>),
    Clients(Vec<(usize, shared_types::CreateClientConseilRequest)>),
    Dossiers(Vec<(usize, shared_types::CreateDossierRequest)>),
    Lots(Vec<(usize, shared_types::CreateLotRequest)>),
}

impl Valides {
    fn len(&self) -> usize {
        match self {
            Self::Locataires(v) => v.len(),
            Self::Clients(v) => v.len(),
            Self::Dossiers(v) => v.len(),
            Self::Lots(v) => v.len(),
        }
    }
}

/// Run the row parser over every row, collecting failures as report errors.
fn collect<T>(
    table: &CsvTable,
    erreurs: &mut Vec<ImportErreur>,
    parse: impl Fn(&spreadsheet::CsvRow) -> Result<T, String>,
) -> Vec<(usize, T)> {
    let mut ok = Vec::new();
    for row in &table.rows {
        match parse(row) {
            Ok(item) => ok.push((row.ligne, item)),
            Err(message) => erreurs.push(ImportErreur {
                ligne: row.ligne,
                message,
            }),
        }
    }
    ok
}

/// Resolve each lot's building reference, once per distinct reference.
async fn resolve_lots(
    pool: &Pool<Postgres>,
    lots: Vec<(usize, LotImport)>,
    erreurs: &mut Vec<ImportErreur>,
) -> Result<Vec<(usize, shared_types::CreateLotRequest)>, AppError> {
    let mut immeubles: HashMap<String, Option<Uuid>> = HashMap::new();
    let mut resolved = Vec::with_capacity(lots.len());

    for (ligne, import) in lots {
        let reference = import.immeuble_reference.trim().to_uppercase();
        let id = match immeubles.get(&reference) {
            Some(id) => *id,
            None => {
                let id = crate::repo::immobilier::find_immeuble_by_reference(pool, &reference)
                    .await?
                    .map(|i| i.id);
                immeubles.insert(reference.clone(), id);
                id
            }
        };
        match id {
            Some(immeuble_id) => {
                let mut lot = import.lot;
                lot.immeuble_id = immeuble_id;
                resolved.push((ligne, lot));
            }
            None => erreurs.push(ImportErreur {
                ligne,
                message: format!("Immeuble {} not found", reference),
            }),
        }
    }
    Ok(resolved)
}

/// Insert every valid row in one transaction. Returns how many were written.
async fn insert_all(pool: &Pool<Postgres>, valides: &Valides) -> Result<usize, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    match valides {
        Valides::Locataires(rows) => {
            for (ligne, req) in rows {
                let locataire = crate::repo::immobilier::insert_locataire(&mut tx, req)
                    .await
                    .map_err(|e| at_line(*ligne, e))?;
                crate::search::index(&locataire);
            }
        }
        Valides::Clients(rows) => {
            for (ligne, req) in rows {
                let reference =
                    crate::reference::next_reference(&mut tx, ReferenceKind::ClientConseil).await?;
                let client = crate::repo::conseil::insert_client(&mut tx, &reference, req)
                    .await
                    .map_err(|e| at_line(*ligne, e))?;
                crate::search::index(&client);
            }
        }
        Valides::Dossiers(rows) => {
            for (ligne, req) in rows {
                let reference =
                    crate::reference::next_reference(&mut tx, ReferenceKind::Recouvrement).await?;
                let dossier = crate::repo::recouvrement::insert_dossier(&mut tx, &reference, req)
                    .await
                    .map_err(|e| at_line(*ligne, e))?;
                crate::search::index(&dossier);
            }
        }
        Valides::Lots(rows) => {
            for (ligne, req) in rows {
                crate::repo::immobilier::insert_lot(&mut tx, req)
                    .await
                    .map_err(|e| at_line(*ligne, e))?;
            }
        }
    }

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(valides.len())
}

/// POST /api/imports/{entite}
///
/// Body is the CSV text. Every invalid row is reported. Rows are written
/// together only when none is invalid and `dry_run` is off.
#[utoipa::path(
    post,
    path = "/api/imports/{entite}",
    params(
        ("entite" = String, Path, description = "locataires, clients-conseil, dossiers-recouvrement or lots"),
        ImportParams
    ),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Empty body or missing required column", body = AppError),
        (status = 404, description = "Unknown entity", body = AppError)
    ),
    tag = "imports"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn import(
    State(pool): State<Pool<Postgres>>,
    RoleRequired(claims): RoleRequired<ROLE_GESTIONNAIRE>,
    Path(entite): Path<String>,
    Query(params): Query<ImportParams>,
    body: String,
) -> Result<Json<ImportReport>, AppError> {
    let kind = ImportEntite::from_slug(&entite).ok_or_else(|| entite_not_found(&entite))?;
    let table = spreadsheet::parse_csv(&body)?;
    table.require(kind.required_columns())?;

    let mut erreurs: Vec<ImportErreur> = table
        .unreadable
        .iter()
        .map(|(ligne, message)| ImportErreur {
            ligne: *ligne,
            message: message.clone(),
        })
        .collect();

    let valides = match kind {
        ImportEntite::Locataires => {
            Valides::Locataires(collect(&table, &mut erreurs, spreadsheet::locataire_from_row))
        }
        ImportEntite::ClientsConseil => {
            Valides::Clients(collect(&table, &mut erreurs, spreadsheet::client_from_row))
        }
        ImportEntite::DossiersRecouvrement => {
            Valides::Dossiers(collect(&table, &mut erreurs, spreadsheet::dossier_from_row))
        }
        ImportEntite::Lots => {
            let lots = collect(&table, &mut erreurs, spreadsheet::lot_from_row);
            Valides::Lots(resolve_lots(&pool, lots, &mut erreurs).await?)
        }
    };
    erreurs.sort_by_key(|e| e.ligne);

    let lignes_valides = valides.len();
    let lignes_importees = if params.dry_run || lignes_valides == 0 || !erreurs.is_empty() {
        0
    } else {
        insert_all(&pool, &valides).await?
    };

    tracing::info!(
        entite = kind.slug(),
        dry_run = params.dry_run,
        valides = lignes_valides,
        importees = lignes_importees,
        erreurs = erreurs.len(),
        "CSV import"
    );
    if lignes_importees > 0 {
        crate::audit::record(
            &pool,
            Some(claims.sub),
            "import",
            kind.slug(),
            None,
            Some(serde_json::json!({
                "lignes_importees": lignes_importees,
                "erreurs": erreurs.len(),
            })),
        )
        .await;
    }

    Ok(Json(ImportReport {
        entite: kind.slug().to_string(),
        dry_run: params.dry_run,
        lignes_total: table.rows.len() + table.unreadable.len(),
        lignes_valides,
        lignes_importees,
        erreurs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_prefix_keeps_the_error_kind() {
        let err = at_line(7, AppError::conflict("This numero is already used"));
        assert_eq!(err.status_code_u16(), 409);
        assert_eq!(err.message, "Line 7: This numero is already used");
    }

    #[test]
    fn collect_splits_valid_rows_from_errors() {
        let table = spreadsheet::parse_csv(
            "type_locataire,nom,raison_sociale\nparticulier,Kone,\nentreprise,,\n",
        )
        .unwrap();
        let mut erreurs = Vec::new();
        let ok = collect(&table, &mut erreurs, spreadsheet::locataire_from_row);

        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].0, 2);
        assert_eq!(erreurs.len(), 1);
        assert_eq!(erreurs[0].ligne, 3);
    }
}
