use shared_types::{
    check_echeance, check_paiement, facture_accepte_paiement, money,
    statut_facture_apres_paiements, AppError, ClientConseil, ClientConseilListParams,
    ConseilTotaux, CreateClientConseilRequest, CreateFactureRequest, CreatePaiementRequest,
    FactureConseil, FactureListParams, FactureRow, PaginatedResponse, PaiementConseil,
    ReferenceKind, UpdateClientConseilRequest, UpdateFactureRequest,
};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;
use crate::reference::next_reference;

// ── Clients ─────────────────────────────────────────────────────

/// Register an advisory client under a fresh `CLC-NNNN` reference.
pub async fn create_client(
    pool: &Pool<Postgres>,
    req: &CreateClientConseilRequest,
) -> Result<ClientConseil, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let reference = next_reference(&mut tx, ReferenceKind::ClientConseil).await?;
    let client = insert_client(&mut tx, &reference, req).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(client)
}

/// Insert with a reference already reserved on `conn` (imports reuse this).
pub async fn insert_client(
    conn: &mut PgConnection,
    reference: &str,
    req: &CreateClientConseilRequest,
) -> Result<ClientConseil, AppError> {
    sqlx::query_as::<_, ClientConseil>(
        r#"
        INSERT INTO clients_conseil
            (reference, type_client, nom, raison_sociale, contact_nom, telephone, email,
             adresse, honoraire_mensuel, statut, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, 'actif'), $11)
        RETURNING *
        "#,
    )
    .bind(reference)
    .bind(&req.type_client)
    .bind(req.nom.trim())
    .bind(req.raison_sociale.as_deref().map(str::trim))
    .bind(req.contact_nom.as_deref())
    .bind(req.telephone.as_deref())
    .bind(req.email.as_deref())
    .bind(req.adresse.as_deref())
    .bind(req.honoraire_mensuel)
    .bind(req.statut.as_deref())
    .bind(req.notes.as_deref())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_client(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<ClientConseil>, AppError> {
    sqlx::query_as::<_, ClientConseil>("SELECT * FROM clients_conseil WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

fn client_listing(params: &ClientConseilListParams) -> Listing {
    Listing::new("clients_conseil", "*")
        .search(
            &["reference", "nom", "raison_sociale", "contact_nom", "email"],
            params.q.as_deref(),
        )
        .eq("statut", params.statut.clone())
        .eq("type_client", params.type_client.clone())
        .order_by("reference ASC")
}

pub async fn list_clients(
    pool: &Pool<Postgres>,
    params: &ClientConseilListParams,
) -> Result<PaginatedResponse<ClientConseil>, AppError> {
    client_listing(params)
        .fetch_page(pool, params.page, params.limit)
        .await
}

pub async fn list_all_clients(
    pool: &Pool<Postgres>,
    params: &ClientConseilListParams,
) -> Result<Vec<ClientConseil>, AppError> {
    client_listing(params).fetch_all(pool).await
}

pub async fn update_client(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateClientConseilRequest,
) -> Result<Option<ClientConseil>, AppError> {
    sqlx::query_as::<_, ClientConseil>(
        r#"
        UPDATE clients_conseil SET
            type_client = COALESCE($2, type_client),
            nom = COALESCE($3, nom),
            raison_sociale = COALESCE($4, raison_sociale),
            contact_nom = COALESCE($5, contact_nom),
            telephone = COALESCE($6, telephone),
            email = COALESCE($7, email),
            adresse = COALESCE($8, adresse),
            honoraire_mensuel = COALESCE($9, honoraire_mensuel),
            statut = COALESCE($10, statut),
            notes = COALESCE($11, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.type_client.as_deref())
    .bind(req.nom.as_deref().map(str::trim))
    .bind(req.raison_sociale.as_deref().map(str::trim))
    .bind(req.contact_nom.as_deref())
    .bind(req.telephone.as_deref())
    .bind(req.email.as_deref())
    .bind(req.adresse.as_deref())
    .bind(req.honoraire_mensuel)
    .bind(req.statut.as_deref())
    .bind(req.notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_client(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM clients_conseil WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

/// Client and invoicing totals. Cancelled invoices are not counted as billed.
pub async fn totaux(pool: &Pool<Postgres>) -> Result<ConseilTotaux, AppError> {
    sqlx::query_as::<_, ConseilTotaux>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM clients_conseil) AS clients_total,
            (SELECT COUNT(*) FROM clients_conseil WHERE statut = 'actif') AS clients_actifs,
            (SELECT COUNT(*) FROM factures_conseil WHERE statut <> 'annulee') AS nombre_factures,
            COALESCE((SELECT SUM(montant_ttc) FROM factures_conseil
                      WHERE statut <> 'annulee'), 0)::BIGINT AS total_facture,
            COALESCE((SELECT SUM(montant) FROM paiements_conseil), 0)::BIGINT AS total_encaisse
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Factures ────────────────────────────────────────────────────

const FACTURE_FROM: &str = "factures_conseil f JOIN clients_conseil c ON c.id = f.client_id";

const FACTURE_COLUMNS: &str = "f.*, COALESCE(NULLIF(c.raison_sociale, ''), c.nom) AS client_nom, \
    COALESCE((SELECT SUM(p.montant) FROM paiements_conseil p \
              WHERE p.facture_id = f.id), 0)::BIGINT AS montant_paye";

fn conflict_statut(facture: &FactureConseil, action: &str) -> AppError {
    AppError::conflict(format!(
        "Invoice {} is {} and cannot be {}",
        facture.numero, facture.statut, action
    ))
}

fn totaux_facture(montant_ht: i64, taux_tva: f64) -> Result<(i64, i64), AppError> {
    money::montants_facture(montant_ht, taux_tva)
        .ok_or_else(|| AppError::invalid_field("montant_ht", "Invoice total is too large"))
}

/// Draft a new invoice numbered `FAC-YYYY-NNNN`. VAT and TTC are computed
/// from `montant_ht`; `taux_defaut` applies when no rate is given.
pub async fn create_facture(
    pool: &Pool<Postgres>,
    req: &CreateFactureRequest,
    taux_defaut: f64,
) -> Result<FactureConseil, AppError> {
    let taux_tva = req.taux_tva.unwrap_or(taux_defaut);
    let (montant_tva, montant_ttc) = totaux_facture(req.montant_ht, taux_tva)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let numero = next_reference(&mut tx, ReferenceKind::Facture).await?;

    let facture = sqlx::query_as::<_, FactureConseil>(
        r#"
        INSERT INTO factures_conseil
            (numero, client_id, objet, date_emission, date_echeance, montant_ht,
             taux_tva, montant_tva, montant_ttc, statut)
        VALUES ($1, $2, $3, COALESCE($4, CURRENT_DATE), $5, $6, $7, $8, $9, 'brouillon')
        RETURNING *
        "#,
    )
    .bind(&numero)
    .bind(req.client_id)
    .bind(req.objet.trim())
    .bind(req.date_emission)
    .bind(req.date_echeance)
    .bind(req.montant_ht)
    .bind(taux_tva)
    .bind(montant_tva)
    .bind(montant_ttc)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(facture)
}

pub async fn find_facture(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<FactureRow>, AppError> {
    sqlx::query_as::<_, FactureRow>(
        r#"
        SELECT f.*, COALESCE(NULLIF(c.raison_sociale, ''), c.nom) AS client_nom,
               COALESCE((SELECT SUM(p.montant) FROM paiements_conseil p
                         WHERE p.facture_id = f.id), 0)::BIGINT AS montant_paye
        FROM factures_conseil f
        JOIN clients_conseil c ON c.id = f.client_id
        WHERE f.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

fn facture_listing(params: &FactureListParams) -> Listing {
    Listing::new(FACTURE_FROM, FACTURE_COLUMNS)
        .search(&["f.numero", "f.objet"], params.q.as_deref())
        .eq("f.client_id", params.client_id)
        .eq("f.statut", params.statut.clone())
        .order_by("f.date_emission DESC, f.numero DESC")
}

pub async fn list_factures(
    pool: &Pool<Postgres>,
    params: &FactureListParams,
) -> Result<PaginatedResponse<FactureRow>, AppError> {
    facture_listing(params)
        .fetch_page(pool, params.page, params.limit)
        .await
}

pub async fn list_all_factures(
    pool: &Pool<Postgres>,
    params: &FactureListParams,
) -> Result<Vec<FactureRow>, AppError> {
    facture_listing(params).fetch_all(pool).await
}

async fn lock_facture(conn: &mut PgConnection, id: Uuid) -> Result<Option<FactureConseil>, AppError> {
    sqlx::query_as::<_, FactureConseil>("SELECT * FROM factures_conseil WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

async fn montant_paye(conn: &mut PgConnection, facture_id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(montant), 0)::BIGINT FROM paiements_conseil WHERE facture_id = $1",
    )
    .bind(facture_id)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

async fn set_statut(conn: &mut PgConnection, id: Uuid, statut: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE factures_conseil SET statut = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(statut)
        .execute(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Edit a draft. Amounts are recomputed from the merged HT and VAT rate.
pub async fn update_facture(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateFactureRequest,
) -> Result<Option<FactureConseil>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(current) = lock_facture(&mut tx, id).await? else {
        return Ok(None);
    };
    if current.statut != "brouillon" {
        return Err(conflict_statut(&current, "edited"));
    }

    let date_emission = req.date_emission.unwrap_or(current.date_emission);
    let date_echeance = req.date_echeance.or(current.date_echeance);
    check_echeance(date_emission, date_echeance)
        .map_err(|msg| AppError::invalid_field("date_echeance", msg))?;

    let montant_ht = req.montant_ht.unwrap_or(current.montant_ht);
    let taux_tva = req.taux_tva.unwrap_or(current.taux_tva);
    let (montant_tva, montant_ttc) = totaux_facture(montant_ht, taux_tva)?;

    let facture = sqlx::query_as::<_, FactureConseil>(
        r#"
        UPDATE factures_conseil SET
            objet = COALESCE($2, objet),
            date_emission = $3,
            date_echeance = $4,
            montant_ht = $5,
            taux_tva = $6,
            montant_tva = $7,
            montant_ttc = $8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.objet.as_deref().map(str::trim))
    .bind(date_emission)
    .bind(date_echeance)
    .bind(montant_ht)
    .bind(taux_tva)
    .bind(montant_tva)
    .bind(montant_ttc)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(facture))
}

/// Delete a draft invoice. Issued invoices are kept (cancel them instead).
pub async fn delete_facture(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(current) = lock_facture(&mut tx, id).await? else {
        return Ok(false);
    };
    if current.statut != "brouillon" {
        return Err(conflict_statut(&current, "deleted"));
    }

    sqlx::query("DELETE FROM factures_conseil WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}

/// `brouillon` → `emise`, or straight to `payee` when nothing is due.
pub async fn emettre(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(current) = lock_facture(&mut tx, id).await? else {
        return Ok(false);
    };
    if current.statut != "brouillon" {
        return Err(conflict_statut(&current, "issued"));
    }
    set_statut(&mut tx, id, statut_facture_apres_paiements(current.montant_ttc, 0)).await?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}

/// Cancel an invoice that has received no payment.
pub async fn annuler(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(current) = lock_facture(&mut tx, id).await? else {
        return Ok(false);
    };
    if current.statut == "annulee" {
        return Err(conflict_statut(&current, "cancelled again"));
    }
    if montant_paye(&mut tx, id).await? > 0 {
        return Err(AppError::conflict(format!(
            "Invoice {} has payments and cannot be cancelled",
            current.numero
        )));
    }
    set_statut(&mut tx, id, "annulee").await?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}

// ── Paiements ───────────────────────────────────────────────────

/// Record a payment on an issued invoice and re-derive its status.
pub async fn create_paiement(
    pool: &Pool<Postgres>,
    facture_id: Uuid,
    req: &CreatePaiementRequest,
) -> Result<Option<PaiementConseil>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let Some(facture) = lock_facture(&mut tx, facture_id).await? else {
        return Ok(None);
    };
    if !facture_accepte_paiement(&facture.statut) {
        return Err(conflict_statut(&facture, "paid"));
    }

    let paye = montant_paye(&mut tx, facture_id).await?;
    check_paiement(req.montant, money::reste(facture.montant_ttc, paye))
        .map_err(|msg| AppError::bad_field("montant", msg))?;

    let paiement = sqlx::query_as::<_, PaiementConseil>(
        r#"
        INSERT INTO paiements_conseil
            (facture_id, montant, date_paiement, mode_paiement, reference)
        VALUES ($1, $2, COALESCE($3, CURRENT_DATE), $4, $5)
        RETURNING *
        "#,
    )
    .bind(facture_id)
    .bind(req.montant)
    .bind(req.date_paiement)
    .bind(&req.mode_paiement)
    .bind(req.reference.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let statut = statut_facture_apres_paiements(facture.montant_ttc, paye + req.montant);
    set_statut(&mut tx, facture_id, statut).await?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(Some(paiement))
}

pub async fn list_paiements(pool: &Pool<Postgres>, facture_id: Uuid) -> Result<Vec<PaiementConseil>, AppError> {
    sqlx::query_as::<_, PaiementConseil>(
        r#"
        SELECT * FROM paiements_conseil
        WHERE facture_id = $1
        ORDER BY date_paiement ASC, created_at ASC
        "#,
    )
    .bind(facture_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Remove a payment and re-derive the invoice status.
pub async fn delete_paiement(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let facture_id = sqlx::query_scalar::<_, Uuid>("SELECT facture_id FROM paiements_conseil WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    let Some(facture_id) = facture_id else {
        return Ok(false);
    };
    let Some(facture) = lock_facture(&mut tx, facture_id).await? else {
        return Ok(false);
    };

    sqlx::query("DELETE FROM paiements_conseil WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let paye = montant_paye(&mut tx, facture_id).await?;
    set_statut(
        &mut tx,
        facture_id,
        statut_facture_apres_paiements(facture.montant_ttc, paye),
    )
    .await?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}
