use shared_types::{
    check_paiement, money, AppError, CreateDepenseRequest, CreateHonorairesRequest,
    CreatePaiementRequest, Depense, Honoraires, HonorairesRow, PaiementHonoraires,
    UpdateDepenseRequest, UpdateHonorairesRequest,
};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

// ── Fee agreements ──────────────────────────────────────────────

pub async fn create(pool: &Pool<Postgres>, req: &CreateHonorairesRequest) -> Result<Honoraires, AppError> {
    sqlx::query_as::<_, Honoraires>(
        r#"
        INSERT INTO honoraires_contentieux
            (affaire_id, libelle, mode_facturation, montant_convenu, date_convention, notes)
        VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6)
        RETURNING *
        "#,
    )
    .bind(req.affaire_id)
    .bind(req.libelle.trim())
    .bind(&req.mode_facturation)
    .bind(req.montant_convenu)
    .bind(req.date_convention)
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<HonorairesRow>, AppError> {
    sqlx::query_as::<_, HonorairesRow>(
        r#"
        SELECT h.*,
               COALESCE((SELECT SUM(p.montant) FROM paiements_honoraires_contentieux p
                         WHERE p.honoraires_id = h.id), 0)::BIGINT AS montant_paye
        FROM honoraires_contentieux h
        WHERE h.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_by_affaire(pool: &Pool<Postgres>, affaire_id: Uuid) -> Result<Vec<HonorairesRow>, AppError> {
    sqlx::query_as::<_, HonorairesRow>(
        r#"
        SELECT h.*,
               COALESCE((SELECT SUM(p.montant) FROM paiements_honoraires_contentieux p
                         WHERE p.honoraires_id = h.id), 0)::BIGINT AS montant_paye
        FROM honoraires_contentieux h
        WHERE h.affaire_id = $1
        ORDER BY h.date_convention ASC, h.created_at ASC
        "#,
    )
    .bind(affaire_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Lock a fee agreement and return its agreed amount and what is paid so far.
async fn lock_situation(conn: &mut PgConnection, id: Uuid) -> Result<Option<(i64, i64)>, AppError> {
    let convenu = sqlx::query_scalar::<_, i64>(
        "SELECT montant_convenu FROM honoraires_contentieux WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let Some(convenu) = convenu else {
        return Ok(None);
    };

    let paye = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(montant), 0)::BIGINT
        FROM paiements_honoraires_contentieux WHERE honoraires_id = $1
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(Some((convenu, paye)))
}

/// Partial update. The agreed amount may not drop below what is already paid.
pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateHonorairesRequest,
) -> Result<Option<Honoraires>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some((_, paye)) = lock_situation(&mut tx, id).await? else {
        return Ok(None);
    };
    if let Some(montant) = req.montant_convenu {
        if montant < paye {
            return Err(AppError::bad_field(
                "montant_convenu",
                format!("montant_convenu cannot be lower than the {} already paid", paye),
            ));
        }
    }

    let honoraires = sqlx::query_as::<_, Honoraires>(
        r#"
        UPDATE honoraires_contentieux SET
            libelle = COALESCE($2, libelle),
            mode_facturation = COALESCE($3, mode_facturation),
            montant_convenu = COALESCE($4, montant_convenu),
            date_convention = COALESCE($5, date_convention),
            notes = COALESCE($6, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.libelle.as_deref().map(str::trim))
    .bind(req.mode_facturation.as_deref())
    .bind(req.montant_convenu)
    .bind(req.date_convention)
    .bind(req.notes.as_deref())
    .fetch_optional(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(honoraires)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM honoraires_contentieux WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Payments ────────────────────────────────────────────────────

/// Record a payment. Returns `None` when the agreement does not exist.
pub async fn create_paiement(
    pool: &Pool<Postgres>,
    honoraires_id: Uuid,
    req: &CreatePaiementRequest,
) -> Result<Option<PaiementHonoraires>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some((convenu, paye)) = lock_situation(&mut tx, honoraires_id).await? else {
        return Ok(None);
    };
    check_paiement(req.montant, money::reste(convenu, paye))
        .map_err(|msg| AppError::bad_field("montant", msg))?;

    let paiement = sqlx::query_as::<_, PaiementHonoraires>(
        r#"
        INSERT INTO paiements_honoraires_contentieux
            (honoraires_id, montant, date_paiement, mode_paiement, reference)
        VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, $5)
        RETURNING *
        "#,
    )
    .bind(honoraires_id)
    .bind(req.montant)
    .bind(req.date_paiement)
    .bind(&req.mode_paiement)
    .bind(req.reference.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(paiement))
}

pub async fn list_paiements(
    pool: &Pool<Postgres>,
    honoraires_id: Uuid,
) -> Result<Vec<PaiementHonoraires>, AppError> {
    sqlx::query_as::<_, PaiementHonoraires>(
        r#"
        SELECT * FROM paiements_honoraires_contentieux
        WHERE honoraires_id = $1
        ORDER BY date_paiement ASC, created_at ASC
        "#,
    )
    .bind(honoraires_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// All payments on every agreement of an affaire (fee statement).
pub async fn list_paiements_by_affaire(
    pool: &Pool<Postgres>,
    affaire_id: Uuid,
) -> Result<Vec<PaiementHonoraires>, AppError> {
    sqlx::query_as::<_, PaiementHonoraires>(
        r#"
        SELECT p.* FROM paiements_honoraires_contentieux p
        JOIN honoraires_contentieux h ON h.id = p.honoraires_id
        WHERE h.affaire_id = $1
        ORDER BY p.date_paiement ASC, p.created_at ASC
        "#,
    )
    .bind(affaire_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_paiement(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM paiements_honoraires_contentieux WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Expenses ────────────────────────────────────────────────────

pub async fn create_depense(pool: &Pool<Postgres>, req: &CreateDepenseRequest) -> Result<Depense, AppError> {
    sqlx::query_as::<_, Depense>(
        r#"
        INSERT INTO depenses_affaires
            (affaire_id, libelle, categorie, montant, date_depense, justificatif)
        VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE), $6)
        RETURNING *
        "#,
    )
    .bind(req.affaire_id)
    .bind(req.libelle.trim())
    .bind(&req.categorie)
    .bind(req.montant)
    .bind(req.date_depense)
    .bind(req.justificatif.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_depenses_by_affaire(pool: &Pool<Postgres>, affaire_id: Uuid) -> Result<Vec<Depense>, AppError> {
    sqlx::query_as::<_, Depense>(
        r#"
        SELECT * FROM depenses_affaires
        WHERE affaire_id = $1
        ORDER BY date_depense ASC, created_at ASC
        "#,
    )
    .bind(affaire_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_depense(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateDepenseRequest,
) -> Result<Option<Depense>, AppError> {
    sqlx::query_as::<_, Depense>(
        r#"
        UPDATE depenses_affaires SET
            libelle = COALESCE($2, libelle),
            categorie = COALESCE($3, categorie),
            montant = COALESCE($4, montant),
            date_depense = COALESCE($5, date_depense),
            justificatif = COALESCE($6, justificatif),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.libelle.as_deref().map(str::trim))
    .bind(req.categorie.as_deref())
    .bind(req.montant)
    .bind(req.date_depense)
    .bind(req.justificatif.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_depense(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM depenses_affaires WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}
