use chrono::{Duration, Utc};
use shared_types::{debut_de_mois, money, AppError, TableauDeBord};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

#[derive(Debug, sqlx::FromRow)]
struct Compteurs {
    affaires_en_cours: i64,
    audiences_a_venir: i64,
    dossiers_actifs: i64,
    du_actifs: i64,
    recouvre_actifs: i64,
    lots_occupes: i64,
    lots_total: i64,
    encaissements_mois: i64,
    commission_mois: i64,
    factures_impayees: i64,
    factures_ttc: i64,
    factures_payees: i64,
}

/// Home screen figures, computed in a single round trip.
pub async fn tableau_de_bord(pool: &Pool<Postgres>) -> Result<TableauDeBord, AppError> {
    let today = Utc::now().date_naive();

    let c = sqlx::query_as::<_, Compteurs>(
        r#"
        WITH actifs AS (
            SELECT id, montant_principal + frais + interets AS du
            FROM dossiers_recouvrement
            WHERE statut NOT IN ('solde', 'cloture', 'irrecouvrable')
        ),
        impayees AS (
            SELECT id, montant_ttc FROM factures_conseil
            WHERE statut IN ('emise', 'partiellement_payee')
        )
        SELECT
            (SELECT COUNT(*) FROM affaires WHERE statut = 'en_cours') AS affaires_en_cours,
            (SELECT COUNT(*) FROM audiences
             WHERE statut = 'programmee' AND date_audience BETWEEN $1 AND $2) AS audiences_a_venir,
            (SELECT COUNT(*) FROM actifs) AS dossiers_actifs,
            COALESCE((SELECT SUM(du) FROM actifs), 0)::BIGINT AS du_actifs,
            COALESCE((SELECT SUM(p.montant) FROM paiements_recouvrement p
                      JOIN actifs a ON a.id = p.dossier_id), 0)::BIGINT AS recouvre_actifs,
            (SELECT COUNT(*) FROM lots WHERE statut = 'occupe') AS lots_occupes,
            (SELECT COUNT(*) FROM lots) AS lots_total,
            COALESCE((SELECT SUM(montant) FROM encaissements_loyers
                      WHERE periode = $3), 0)::BIGINT AS encaissements_mois,
            COALESCE((SELECT SUM(commission_capco) FROM encaissements_loyers
                      WHERE periode = $3), 0)::BIGINT AS commission_mois,
            (SELECT COUNT(*) FROM impayees) AS factures_impayees,
            COALESCE((SELECT SUM(montant_ttc) FROM impayees), 0)::BIGINT AS factures_ttc,
            COALESCE((SELECT SUM(p.montant) FROM paiements_conseil p
                      JOIN impayees f ON f.id = p.facture_id), 0)::BIGINT AS factures_payees
        "#,
    )
    .bind(today)
    .bind(today + Duration::days(7))
    .bind(debut_de_mois(today))
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(TableauDeBord {
        affaires_en_cours: c.affaires_en_cours,
        audiences_a_venir: c.audiences_a_venir,
        dossiers_actifs: c.dossiers_actifs,
        reste_du_recouvrement: money::reste(c.du_actifs, c.recouvre_actifs),
        lots_occupes: c.lots_occupes,
        lots_total: c.lots_total,
        taux_occupation: money::taux(c.lots_occupes, c.lots_total),
        encaissements_mois: c.encaissements_mois,
        commission_mois: c.commission_mois,
        factures_impayees: c.factures_impayees,
        montant_factures_impayees: money::reste(c.factures_ttc, c.factures_payees),
    })
}
