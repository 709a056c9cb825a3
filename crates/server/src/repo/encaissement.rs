use chrono::NaiveDate;
use shared_types::{
    designation_locataire, money, AppError, CreateEncaissementRequest, Encaissement, ImpayeRow,
    PaginatedResponse, SyntheseMois,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;

/// Filters of the rent collection list, with periods already parsed.
#[derive(Debug, Clone, Default)]
pub struct EncaissementFilter {
    pub lot_id: Option<Uuid>,
    pub immeuble_id: Option<Uuid>,
    pub du: Option<NaiveDate>,
    pub au: Option<NaiveDate>,
}

/// A collection joined with its lot and tenant, for statements and exports.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EncaissementDetail {
    #[sqlx(flatten)]
    pub encaissement: Encaissement,
    pub lot_numero: String,
    pub immeuble_reference: String,
    pub type_locataire: Option<String>,
    pub locataire_nom: Option<String>,
    pub locataire_prenom: Option<String>,
    pub locataire_raison_sociale: Option<String>,
}

impl EncaissementDetail {
    pub fn locataire(&self) -> String {
        self.type_locataire
            .as_deref()
            .map(|t| {
                designation_locataire(
                    t,
                    self.locataire_nom.as_deref(),
                    self.locataire_prenom.as_deref(),
                    self.locataire_raison_sociale.as_deref(),
                )
            })
            .unwrap_or_default()
    }
}

const DETAIL_FROM: &str = "encaissements_loyers e \
    JOIN lots l ON l.id = e.lot_id \
    JOIN immeubles i ON i.id = l.immeuble_id \
    LEFT JOIN locataires t ON t.id = e.locataire_id";

const DETAIL_COLUMNS: &str = "e.*, l.numero AS lot_numero, i.reference AS immeuble_reference, \
    t.type_locataire, t.nom AS locataire_nom, t.prenom AS locataire_prenom, \
    t.raison_sociale AS locataire_raison_sociale";

/// Record a rent payment for `periode` (first day of the month).
///
/// The tenant defaults to the lot's current occupant; the commission uses
/// the building's rate at the time of collection.
pub async fn create(
    pool: &Pool<Postgres>,
    req: &CreateEncaissementRequest,
    periode: NaiveDate,
) -> Result<Encaissement, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let lot = sqlx::query_as::<_, (Option<Uuid>, f64)>(
        r#"
        SELECT l.locataire_id, i.taux_commission
        FROM lots l JOIN immeubles i ON i.id = l.immeuble_id
        WHERE l.id = $1
        FOR SHARE OF l
        "#,
    )
    .bind(req.lot_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let Some((locataire_courant, taux_commission)) = lot else {
        return Err(AppError::invalid_field(
            "lot_id",
            format!("Lot {} does not exist", req.lot_id),
        ));
    };

    if let Some(locataire_id) = req.locataire_id {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM locataires WHERE id = $1)",
        )
        .bind(locataire_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        if !exists {
            return Err(AppError::invalid_field(
                "locataire_id",
                format!("Locataire {locataire_id} does not exist"),
            ));
        }
    }

    let (commission, net) = money::commission_loyer(req.montant, taux_commission);

    let encaissement = sqlx::query_as::<_, Encaissement>(
        r#"
        INSERT INTO encaissements_loyers
            (lot_id, locataire_id, periode, montant, commission_capco, montant_net,
             date_encaissement, mode_paiement, reference)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, CURRENT_DATE), $8, $9)
        RETURNING *
        "#,
    )
    .bind(req.lot_id)
    .bind(req.locataire_id.or(locataire_courant))
    .bind(periode)
    .bind(req.montant)
    .bind(commission)
    .bind(net)
    .bind(req.date_encaissement)
    .bind(&req.mode_paiement)
    .bind(req.reference.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(encaissement)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Encaissement>, AppError> {
    sqlx::query_as::<_, Encaissement>("SELECT * FROM encaissements_loyers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(
    pool: &Pool<Postgres>,
    filter: &EncaissementFilter,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<PaginatedResponse<Encaissement>, AppError> {
    Listing::new("encaissements_loyers e JOIN lots l ON l.id = e.lot_id", "e.*")
        .eq("e.lot_id", filter.lot_id)
        .eq("l.immeuble_id", filter.immeuble_id)
        .gte("e.periode", filter.du)
        .lte("e.periode", filter.au)
        .order_by("e.periode DESC, e.date_encaissement DESC, e.created_at DESC")
        .fetch_page(pool, page, limit)
        .await
}

/// Every matching collection with lot and tenant, oldest period first.
pub async fn list_details(
    pool: &Pool<Postgres>,
    filter: &EncaissementFilter,
) -> Result<Vec<EncaissementDetail>, AppError> {
    Listing::new(DETAIL_FROM, DETAIL_COLUMNS)
        .eq("e.lot_id", filter.lot_id)
        .eq("l.immeuble_id", filter.immeuble_id)
        .gte("e.periode", filter.du)
        .lte("e.periode", filter.au)
        .order_by("e.periode ASC, l.numero ASC, e.date_encaissement ASC")
        .fetch_all(pool)
        .await
}

pub async fn list_by_lot(pool: &Pool<Postgres>, lot_id: Uuid) -> Result<Vec<Encaissement>, AppError> {
    sqlx::query_as::<_, Encaissement>(
        r#"
        SELECT * FROM encaissements_loyers
        WHERE lot_id = $1
        ORDER BY periode DESC, date_encaissement DESC
        "#,
    )
    .bind(lot_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM encaissements_loyers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

/// Occupied lots whose collections for `periode` total less than the rent.
pub async fn impayes(
    pool: &Pool<Postgres>,
    periode: NaiveDate,
    immeuble_id: Option<Uuid>,
) -> Result<Vec<ImpayeRow>, AppError> {
    sqlx::query_as::<_, ImpayeRow>(
        r#"
        SELECT * FROM (
            SELECT
                l.id AS lot_id,
                l.numero AS lot_numero,
                i.id AS immeuble_id,
                i.nom AS immeuble_nom,
                l.locataire_id,
                t.type_locataire,
                t.nom AS locataire_nom,
                t.prenom AS locataire_prenom,
                t.raison_sociale AS locataire_raison_sociale,
                l.loyer_mensuel AS montant_du,
                COALESCE((SELECT SUM(e.montant) FROM encaissements_loyers e
                          WHERE e.lot_id = l.id AND e.periode = $1), 0)::BIGINT AS montant_encaisse
            FROM lots l
            JOIN immeubles i ON i.id = l.immeuble_id
            LEFT JOIN locataires t ON t.id = l.locataire_id
            WHERE l.statut = 'occupe'
              AND ($2::UUID IS NULL OR l.immeuble_id = $2)
        ) situation
        WHERE montant_encaisse < montant_du
        ORDER BY immeuble_nom ASC, lot_numero ASC
        "#,
    )
    .bind(periode)
    .bind(immeuble_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Monthly totals between `du` and `au` (inclusive periods).
pub async fn synthese(
    pool: &Pool<Postgres>,
    du: NaiveDate,
    au: NaiveDate,
    immeuble_id: Option<Uuid>,
) -> Result<Vec<SyntheseMois>, AppError> {
    sqlx::query_as::<_, SyntheseMois>(
        r#"
        SELECT
            e.periode,
            COUNT(*) AS nombre,
            COALESCE(SUM(e.montant), 0)::BIGINT AS total_encaisse,
            COALESCE(SUM(e.commission_capco), 0)::BIGINT AS total_commission,
            COALESCE(SUM(e.montant_net), 0)::BIGINT AS total_net
        FROM encaissements_loyers e
        JOIN lots l ON l.id = e.lot_id
        WHERE e.periode BETWEEN $1 AND $2
          AND ($3::UUID IS NULL OR l.immeuble_id = $3)
        GROUP BY e.periode
        ORDER BY e.periode ASC
        "#,
    )
    .bind(du)
    .bind(au)
    .bind(immeuble_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
