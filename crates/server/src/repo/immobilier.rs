use shared_types::{
    AppError, AssignLocataireRequest, CreateImmeubleRequest, CreateLocataireRequest,
    CreateLotRequest, Immeuble, ImmeubleListParams, Locataire, LocataireListParams, Lot,
    LotCounts, LotListParams, PaginatedResponse, ReferenceKind, UpdateImmeubleRequest,
    UpdateLocataireRequest, UpdateLotRequest,
};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;
use crate::reference::next_reference;

// ── Immeubles ───────────────────────────────────────────────────

/// Register a building under a fresh `IMM-NNN` reference.
/// `taux_defaut` applies when the request carries no commission rate.
pub async fn create_immeuble(
    pool: &Pool<Postgres>,
    req: &CreateImmeubleRequest,
    taux_defaut: f64,
) -> Result<Immeuble, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let reference = next_reference(&mut tx, ReferenceKind::Immeuble).await?;

    let immeuble = sqlx::query_as::<_, Immeuble>(
        r#"
        INSERT INTO immeubles
            (reference, nom, adresse, ville, proprietaire_nom, proprietaire_contact,
             taux_commission, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&reference)
    .bind(req.nom.trim())
    .bind(req.adresse.trim())
    .bind(req.ville.as_deref())
    .bind(req.proprietaire_nom.trim())
    .bind(req.proprietaire_contact.as_deref())
    .bind(req.taux_commission.unwrap_or(taux_defaut))
    .bind(req.notes.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(immeuble)
}

pub async fn find_immeuble(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Immeuble>, AppError> {
    sqlx::query_as::<_, Immeuble>("SELECT * FROM immeubles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_immeuble_by_reference(
    pool: &Pool<Postgres>,
    reference: &str,
) -> Result<Option<Immeuble>, AppError> {
    sqlx::query_as::<_, Immeuble>("SELECT * FROM immeubles WHERE reference = $1")
        .bind(reference.trim())
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_immeubles(
    pool: &Pool<Postgres>,
    params: &ImmeubleListParams,
) -> Result<PaginatedResponse<Immeuble>, AppError> {
    Listing::new("immeubles", "*")
        .search(
            &["reference", "nom", "adresse", "proprietaire_nom"],
            params.q.as_deref(),
        )
        .eq("ville", params.ville.clone())
        .order_by("reference ASC")
        .fetch_page(pool, params.page, params.limit)
        .await
}

pub async fn list_all_immeubles(pool: &Pool<Postgres>) -> Result<Vec<Immeuble>, AppError> {
    sqlx::query_as::<_, Immeuble>("SELECT * FROM immeubles ORDER BY reference ASC")
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_immeuble(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateImmeubleRequest,
) -> Result<Option<Immeuble>, AppError> {
    sqlx::query_as::<_, Immeuble>(
        r#"
        UPDATE immeubles SET
            nom = COALESCE($2, nom),
            adresse = COALESCE($3, adresse),
            ville = COALESCE($4, ville),
            proprietaire_nom = COALESCE($5, proprietaire_nom),
            proprietaire_contact = COALESCE($6, proprietaire_contact),
            taux_commission = COALESCE($7, taux_commission),
            notes = COALESCE($8, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.nom.as_deref().map(str::trim))
    .bind(req.adresse.as_deref().map(str::trim))
    .bind(req.ville.as_deref())
    .bind(req.proprietaire_nom.as_deref().map(str::trim))
    .bind(req.proprietaire_contact.as_deref())
    .bind(req.taux_commission)
    .bind(req.notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_immeuble(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM immeubles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

/// Lot counts for one building, or the whole portfolio when `immeuble_id` is None.
pub async fn lot_counts(pool: &Pool<Postgres>, immeuble_id: Option<Uuid>) -> Result<LotCounts, AppError> {
    sqlx::query_as::<_, LotCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE statut = 'occupe') AS occupes,
            COUNT(*) FILTER (WHERE statut = 'libre') AS libres,
            COUNT(*) FILTER (WHERE statut = 'travaux') AS travaux,
            COALESCE(SUM(loyer_mensuel), 0)::BIGINT AS somme_loyers
        FROM lots
        WHERE ($1::UUID IS NULL OR immeuble_id = $1)
        "#,
    )
    .bind(immeuble_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Lots ────────────────────────────────────────────────────────

pub async fn create_lot(pool: &Pool<Postgres>, req: &CreateLotRequest) -> Result<Lot, AppError> {
    let mut conn = pool.acquire().await.map_err(SqlxErrorExt::into_app_error)?;
    insert_lot(&mut conn, req).await
}

/// Insert on an open connection so imports can batch rows in one transaction.
pub async fn insert_lot(conn: &mut PgConnection, req: &CreateLotRequest) -> Result<Lot, AppError> {
    sqlx::query_as::<_, Lot>(
        r#"
        INSERT INTO lots
            (immeuble_id, numero, type_lot, etage, surface, loyer_mensuel, statut)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'libre'))
        RETURNING *
        "#,
    )
    .bind(req.immeuble_id)
    .bind(req.numero.trim())
    .bind(&req.type_lot)
    .bind(req.etage.as_deref())
    .bind(req.surface)
    .bind(req.loyer_mensuel)
    .bind(req.statut.as_deref())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_lot(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Lot>, AppError> {
    sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

fn lot_listing(params: &LotListParams) -> Listing {
    Listing::new("lots", "*")
        .search(&["numero"], params.q.as_deref())
        .eq("immeuble_id", params.immeuble_id)
        .eq("statut", params.statut.clone())
        .eq("type_lot", params.type_lot.clone())
        .order_by("immeuble_id ASC, numero ASC")
}

pub async fn list_lots(
    pool: &Pool<Postgres>,
    params: &LotListParams,
) -> Result<PaginatedResponse<Lot>, AppError> {
    lot_listing(params).fetch_page(pool, params.page, params.limit).await
}

pub async fn list_all_lots(pool: &Pool<Postgres>, params: &LotListParams) -> Result<Vec<Lot>, AppError> {
    lot_listing(params).fetch_all(pool).await
}

pub async fn list_lots_by_immeuble(pool: &Pool<Postgres>, immeuble_id: Uuid) -> Result<Vec<Lot>, AppError> {
    sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE immeuble_id = $1 ORDER BY numero ASC")
        .bind(immeuble_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Partial update. `occupe` is only reached through tenant assignment, and an
/// occupied lot keeps its status until the tenant is released.
pub async fn update_lot(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateLotRequest,
) -> Result<Option<Lot>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let current = sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    let Some(current) = current else {
        return Ok(None);
    };

    if let Some(statut) = req.statut.as_deref() {
        if statut == "occupe" && current.statut != "occupe" {
            return Err(AppError::invalid_field(
                "statut",
                "Assign a tenant to mark a lot as occupe",
            ));
        }
        if statut != "occupe" && current.locataire_id.is_some() {
            return Err(AppError::conflict(format!(
                "Lot {} has a tenant; release it before changing the status",
                current.numero
            )));
        }
    }

    let lot = sqlx::query_as::<_, Lot>(
        r#"
        UPDATE lots SET
            numero = COALESCE($2, numero),
            type_lot = COALESCE($3, type_lot),
            etage = COALESCE($4, etage),
            surface = COALESCE($5, surface),
            loyer_mensuel = COALESCE($6, loyer_mensuel),
            statut = COALESCE($7, statut),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.numero.as_deref().map(str::trim))
    .bind(req.type_lot.as_deref())
    .bind(req.etage.as_deref())
    .bind(req.surface)
    .bind(req.loyer_mensuel)
    .bind(req.statut.as_deref())
    .fetch_optional(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(lot)
}

/// Assign a tenant (lot becomes `occupe`) or release it (`libre`).
/// A lot under `travaux` cannot receive a tenant.
pub async fn assign_locataire(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &AssignLocataireRequest,
) -> Result<Option<Lot>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let current = sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    let Some(current) = current else {
        return Ok(None);
    };

    let lot = match req.locataire_id {
        Some(locataire_id) => {
            if current.statut == "travaux" {
                return Err(AppError::conflict(format!(
                    "Lot {} is under works and cannot be let",
                    current.numero
                )));
            }
            sqlx::query_as::<_, Lot>(
                r#"
                UPDATE lots SET
                    locataire_id = $2,
                    statut = 'occupe',
                    date_entree = COALESCE($3, CURRENT_DATE),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(locataire_id)
            .bind(req.date_entree)
            .fetch_one(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_app_error)?
        }
        None => sqlx::query_as::<_, Lot>(
            r#"
            UPDATE lots SET
                locataire_id = NULL,
                statut = CASE WHEN statut = 'occupe' THEN 'libre' ELSE statut END,
                date_entree = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?,
    };

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(lot))
}

pub async fn delete_lot(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM lots WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Locataires ──────────────────────────────────────────────────

pub async fn create_locataire(pool: &Pool<Postgres>, req: &CreateLocataireRequest) -> Result<Locataire, AppError> {
    let mut conn = pool.acquire().await.map_err(SqlxErrorExt::into_app_error)?;
    insert_locataire(&mut conn, req).await
}

pub async fn insert_locataire(
    conn: &mut PgConnection,
    req: &CreateLocataireRequest,
) -> Result<Locataire, AppError> {
    sqlx::query_as::<_, Locataire>(
        r#"
        INSERT INTO locataires
            (type_locataire, nom, prenom, raison_sociale, telephone, email,
             piece_identite, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&req.type_locataire)
    .bind(req.nom.as_deref().map(str::trim))
    .bind(req.prenom.as_deref().map(str::trim))
    .bind(req.raison_sociale.as_deref().map(str::trim))
    .bind(req.telephone.as_deref())
    .bind(req.email.as_deref())
    .bind(req.piece_identite.as_deref())
    .bind(req.notes.as_deref())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_locataire(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Locataire>, AppError> {
    sqlx::query_as::<_, Locataire>("SELECT * FROM locataires WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

fn locataire_listing(params: &LocataireListParams) -> Listing {
    Listing::new("locataires", "*")
        .search(
            &["nom", "prenom", "raison_sociale", "telephone", "email"],
            params.q.as_deref(),
        )
        .eq("type_locataire", params.type_locataire.clone())
        .order_by("COALESCE(raison_sociale, nom) ASC, prenom ASC")
}

pub async fn list_locataires(
    pool: &Pool<Postgres>,
    params: &LocataireListParams,
) -> Result<PaginatedResponse<Locataire>, AppError> {
    locataire_listing(params)
        .fetch_page(pool, params.page, params.limit)
        .await
}

pub async fn list_all_locataires(
    pool: &Pool<Postgres>,
    params: &LocataireListParams,
) -> Result<Vec<Locataire>, AppError> {
    locataire_listing(params).fetch_all(pool).await
}

pub async fn update_locataire(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateLocataireRequest,
) -> Result<Option<Locataire>, AppError> {
    sqlx::query_as::<_, Locataire>(
        r#"
        UPDATE locataires SET
            type_locataire = COALESCE($2, type_locataire),
            nom = COALESCE($3, nom),
            prenom = COALESCE($4, prenom),
            raison_sociale = COALESCE($5, raison_sociale),
            telephone = COALESCE($6, telephone),
            email = COALESCE($7, email),
            piece_identite = COALESCE($8, piece_identite),
            notes = COALESCE($9, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.type_locataire.as_deref())
    .bind(req.nom.as_deref().map(str::trim))
    .bind(req.prenom.as_deref().map(str::trim))
    .bind(req.raison_sociale.as_deref().map(str::trim))
    .bind(req.telephone.as_deref())
    .bind(req.email.as_deref())
    .bind(req.piece_identite.as_deref())
    .bind(req.notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Delete a tenant. Lots it occupied are released (`libre`).
pub async fn delete_locataire(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query(
        r#"
        UPDATE lots SET locataire_id = NULL, statut = 'libre', date_entree = NULL, updated_at = NOW()
        WHERE locataire_id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let result = sqlx::query("DELETE FROM locataires WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}
