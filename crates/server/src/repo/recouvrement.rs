use shared_types::{
    check_paiement, dossier_est_ferme, recouvrement_statut_closes, statut_apres_paiements,
    ActionRecouvrement, AppError, CountByLabel, CreateActionRequest, CreateDossierRequest,
    CreatePaiementRequest, DossierListParams, DossierRecouvrement, DossierRow,
    PaginatedResponse, PaiementRecouvrement, RecouvrementStatistiques, ReferenceKind,
    SituationRecouvrement, UpdateDossierRequest,
};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;
use crate::reference::next_reference;

const ROW_COLUMNS: &str = "d.*, COALESCE((SELECT SUM(p.montant) FROM paiements_recouvrement p \
                           WHERE p.dossier_id = d.id), 0)::BIGINT AS montant_recouvre";

fn closed_error(dossier: &DossierRecouvrement) -> AppError {
    AppError::conflict(format!(
        "Dossier {} is {} and accepts no further changes",
        dossier.reference, dossier.statut
    ))
}

/// Open a dossier under a fresh `REC-YYYY-NNNN` reference.
pub async fn create(pool: &Pool<Postgres>, req: &CreateDossierRequest) -> Result<DossierRow, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let reference = next_reference(&mut tx, ReferenceKind::Recouvrement).await?;
    let dossier = insert_dossier(&mut tx, &reference, req).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(DossierRow {
        dossier,
        montant_recouvre: 0,
    })
}

/// Insert with a reference already reserved on `conn`.
pub async fn insert_dossier(
    conn: &mut PgConnection,
    reference: &str,
    req: &CreateDossierRequest,
) -> Result<DossierRecouvrement, AppError> {
    sqlx::query_as::<_, DossierRecouvrement>(
        r#"
        INSERT INTO dossiers_recouvrement
            (reference, creancier_nom, creancier_contact, debiteur_nom, debiteur_contact,
             debiteur_adresse, montant_principal, frais, interets, statut, date_ouverture, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 'ouvert'),
                COALESCE($11, CURRENT_DATE), $12)
        RETURNING *
        "#,
    )
    .bind(reference)
    .bind(req.creancier_nom.trim())
    .bind(req.creancier_contact.as_deref())
    .bind(req.debiteur_nom.trim())
    .bind(req.debiteur_contact.as_deref())
    .bind(req.debiteur_adresse.as_deref())
    .bind(req.montant_principal)
    .bind(req.frais)
    .bind(req.interets)
    .bind(req.statut.as_deref())
    .bind(req.date_ouverture)
    .bind(req.notes.as_deref())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DossierRow>, AppError> {
    sqlx::query_as::<_, DossierRow>(
        r#"
        SELECT d.*,
               COALESCE((SELECT SUM(p.montant) FROM paiements_recouvrement p
                         WHERE p.dossier_id = d.id), 0)::BIGINT AS montant_recouvre
        FROM dossiers_recouvrement d
        WHERE d.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

fn listing(params: &DossierListParams) -> Listing {
    Listing::new("dossiers_recouvrement d", ROW_COLUMNS)
        .search(
            &["d.reference", "d.creancier_nom", "d.debiteur_nom"],
            params.q.as_deref(),
        )
        .eq("d.statut", params.statut.clone())
        .order_by("d.date_ouverture DESC, d.reference DESC")
}

pub async fn list(
    pool: &Pool<Postgres>,
    params: &DossierListParams,
) -> Result<PaginatedResponse<DossierRow>, AppError> {
    listing(params).fetch_page(pool, params.page, params.limit).await
}

pub async fn list_all(pool: &Pool<Postgres>, params: &DossierListParams) -> Result<Vec<DossierRow>, AppError> {
    listing(params).fetch_all(pool).await
}

/// Lock a dossier row for the rest of the transaction.
async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<DossierRecouvrement>, AppError> {
    sqlx::query_as::<_, DossierRecouvrement>(
        "SELECT * FROM dossiers_recouvrement WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

async fn montant_recouvre(conn: &mut PgConnection, id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(montant), 0)::BIGINT FROM paiements_recouvrement WHERE dossier_id = $1",
    )
    .bind(id)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

async fn set_statut(conn: &mut PgConnection, id: Uuid, statut: &str) -> Result<DossierRecouvrement, AppError> {
    sqlx::query_as::<_, DossierRecouvrement>(
        r#"
        UPDATE dossiers_recouvrement SET
            statut = $2,
            date_cloture = CASE WHEN $3 THEN COALESCE(date_cloture, CURRENT_DATE) ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(statut)
    .bind(recouvrement_statut_closes(statut))
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Re-derive `solde` / `amiable` from the current balance.
async fn sync_statut(conn: &mut PgConnection, dossier: &DossierRecouvrement) -> Result<(), AppError> {
    let recouvre = montant_recouvre(&mut *conn, dossier.id).await?;
    let situation = SituationRecouvrement::compute(
        dossier.montant_principal,
        dossier.frais,
        dossier.interets,
        recouvre,
    );
    if let Some(statut) = statut_apres_paiements(&dossier.statut, situation.reste_du) {
        set_statut(conn, dossier.id, statut).await?;
    }
    Ok(())
}

pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateDossierRequest,
) -> Result<Option<DossierRow>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    if lock(&mut tx, id).await?.is_none() {
        return Ok(None);
    }

    let dossier = sqlx::query_as::<_, DossierRecouvrement>(
        r#"
        UPDATE dossiers_recouvrement SET
            creancier_nom = COALESCE($2, creancier_nom),
            creancier_contact = COALESCE($3, creancier_contact),
            debiteur_nom = COALESCE($4, debiteur_nom),
            debiteur_contact = COALESCE($5, debiteur_contact),
            debiteur_adresse = COALESCE($6, debiteur_adresse),
            montant_principal = COALESCE($7, montant_principal),
            frais = COALESCE($8, frais),
            interets = COALESCE($9, interets),
            date_ouverture = COALESCE($10, date_ouverture),
            notes = COALESCE($11, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.creancier_nom.as_deref().map(str::trim))
    .bind(req.creancier_contact.as_deref())
    .bind(req.debiteur_nom.as_deref().map(str::trim))
    .bind(req.debiteur_contact.as_deref())
    .bind(req.debiteur_adresse.as_deref())
    .bind(req.montant_principal)
    .bind(req.frais)
    .bind(req.interets)
    .bind(req.date_ouverture)
    .bind(req.notes.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    sync_statut(&mut tx, &dossier).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    find_by_id(pool, id).await
}

/// Set the status. `solde`, `cloture` and `irrecouvrable` stamp
/// `date_cloture`; other statuses clear it.
pub async fn update_statut(
    pool: &Pool<Postgres>,
    id: Uuid,
    statut: &str,
) -> Result<Option<DossierRow>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    if lock(&mut tx, id).await?.is_none() {
        return Ok(None);
    }
    set_statut(&mut tx, id, statut).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    find_by_id(pool, id).await
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM dossiers_recouvrement WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Actions ─────────────────────────────────────────────────────

/// Log a collection step. `None` when the dossier does not exist; 409 when
/// it is closed.
pub async fn create_action(
    pool: &Pool<Postgres>,
    dossier_id: Uuid,
    req: &CreateActionRequest,
) -> Result<Option<ActionRecouvrement>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(dossier) = lock(&mut tx, dossier_id).await? else {
        return Ok(None);
    };
    if dossier_est_ferme(&dossier.statut) {
        return Err(closed_error(&dossier));
    }

    let action = sqlx::query_as::<_, ActionRecouvrement>(
        r#"
        INSERT INTO actions_recouvrement
            (dossier_id, type_action, date_action, description, resultat,
             prochaine_etape, date_prochaine_etape)
        VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(dossier_id)
    .bind(&req.type_action)
    .bind(req.date_action)
    .bind(req.description.trim())
    .bind(req.resultat.as_deref())
    .bind(req.prochaine_etape.as_deref())
    .bind(req.date_prochaine_etape)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(action))
}

pub async fn list_actions(pool: &Pool<Postgres>, dossier_id: Uuid) -> Result<Vec<ActionRecouvrement>, AppError> {
    sqlx::query_as::<_, ActionRecouvrement>(
        r#"
        SELECT * FROM actions_recouvrement
        WHERE dossier_id = $1
        ORDER BY date_action ASC, created_at ASC
        "#,
    )
    .bind(dossier_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_action(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let dossier_id = sqlx::query_scalar::<_, Uuid>("SELECT dossier_id FROM actions_recouvrement WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    let Some(dossier_id) = dossier_id else {
        return Ok(false);
    };
    if let Some(dossier) = lock(&mut tx, dossier_id).await? {
        if dossier_est_ferme(&dossier.statut) {
            return Err(closed_error(&dossier));
        }
    }

    let result = sqlx::query("DELETE FROM actions_recouvrement WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Payments ────────────────────────────────────────────────────

/// Record a payment from the debtor and re-derive the dossier status.
pub async fn create_paiement(
    pool: &Pool<Postgres>,
    dossier_id: Uuid,
    req: &CreatePaiementRequest,
) -> Result<Option<PaiementRecouvrement>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(dossier) = lock(&mut tx, dossier_id).await? else {
        return Ok(None);
    };
    if dossier_est_ferme(&dossier.statut) {
        return Err(closed_error(&dossier));
    }

    let recouvre = montant_recouvre(&mut tx, dossier_id).await?;
    let situation = SituationRecouvrement::compute(
        dossier.montant_principal,
        dossier.frais,
        dossier.interets,
        recouvre,
    );
    check_paiement(req.montant, situation.reste_du)
        .map_err(|msg| AppError::bad_field("montant", msg))?;

    let paiement = sqlx::query_as::<_, PaiementRecouvrement>(
        r#"
        INSERT INTO paiements_recouvrement
            (dossier_id, montant, date_paiement, mode_paiement, reference)
        VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, $5)
        RETURNING *
        "#,
    )
    .bind(dossier_id)
    .bind(req.montant)
    .bind(req.date_paiement)
    .bind(&req.mode_paiement)
    .bind(req.reference.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    sync_statut(&mut tx, &dossier).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(paiement))
}

pub async fn list_paiements(
    pool: &Pool<Postgres>,
    dossier_id: Uuid,
) -> Result<Vec<PaiementRecouvrement>, AppError> {
    sqlx::query_as::<_, PaiementRecouvrement>(
        r#"
        SELECT * FROM paiements_recouvrement
        WHERE dossier_id = $1
        ORDER BY date_paiement ASC, created_at ASC
        "#,
    )
    .bind(dossier_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Remove a payment. A `solde` dossier that owes money again reopens as `amiable`.
pub async fn delete_paiement(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let dossier_id = sqlx::query_scalar::<_, Uuid>("SELECT dossier_id FROM paiements_recouvrement WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    let Some(dossier_id) = dossier_id else {
        return Ok(false);
    };
    let Some(dossier) = lock(&mut tx, dossier_id).await? else {
        return Ok(false);
    };
    if dossier_est_ferme(&dossier.statut) {
        return Err(closed_error(&dossier));
    }

    sqlx::query("DELETE FROM paiements_recouvrement WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    sync_statut(&mut tx, &dossier).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}

// ── Statistics ──────────────────────────────────────────────────

pub async fn statistiques(pool: &Pool<Postgres>) -> Result<RecouvrementStatistiques, AppError> {
    let par_statut = sqlx::query_as::<_, CountByLabel>(
        r#"
        SELECT statut AS label, COUNT(*) AS count
        FROM dossiers_recouvrement
        GROUP BY statut ORDER BY statut
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let (total_du, total_recouvre) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            COALESCE((SELECT SUM(montant_principal + frais + interets)
                      FROM dossiers_recouvrement), 0)::BIGINT,
            COALESCE((SELECT SUM(montant) FROM paiements_recouvrement), 0)::BIGINT
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(RecouvrementStatistiques::new(par_statut, total_du, total_recouvre))
}
