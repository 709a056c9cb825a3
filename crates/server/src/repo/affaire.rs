use chrono::Utc;
use shared_types::{
    affaire_statut_closes, money, Affaire, AffaireListParams, AffaireResponse, AffaireStatistiques,
    AffaireSynthese, AppError, Audience, CountByLabel, CreateAffaireRequest, PaginatedResponse,
    ReferenceKind, UpdateAffaireRequest,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;
use crate::reference::next_reference;

/// Open an affaire under a freshly generated `AFF-YYYY-NNNN` reference.
pub async fn create(pool: &Pool<Postgres>, req: &CreateAffaireRequest) -> Result<Affaire, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let reference = next_reference(&mut tx, ReferenceKind::Affaire).await?;

    let affaire = sqlx::query_as::<_, Affaire>(
        r#"
        INSERT INTO affaires
            (reference, intitule, nature, juridiction, client_nom, partie_adverse,
             avocat_adverse, statut, date_ouverture, observations)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'en_cours'),
                COALESCE($9, CURRENT_DATE), $10)
        RETURNING *
        "#,
    )
    .bind(&reference)
    .bind(req.intitule.trim())
    .bind(&req.nature)
    .bind(req.juridiction.trim())
    .bind(req.client_nom.trim())
    .bind(req.partie_adverse.as_deref())
    .bind(req.avocat_adverse.as_deref())
    .bind(req.statut.as_deref())
    .bind(req.date_ouverture)
    .bind(req.observations.as_deref())
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(affaire)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Affaire>, AppError> {
    sqlx::query_as::<_, Affaire>("SELECT * FROM affaires WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

fn listing(params: &AffaireListParams) -> Listing {
    Listing::new("affaires", "*")
        .search(
            &["reference", "intitule", "client_nom", "partie_adverse", "juridiction"],
            params.q.as_deref(),
        )
        .eq("statut", params.statut.clone())
        .eq("nature", params.nature.clone())
        .order_by("date_ouverture DESC, reference DESC")
}

pub async fn list(
    pool: &Pool<Postgres>,
    params: &AffaireListParams,
) -> Result<PaginatedResponse<AffaireResponse>, AppError> {
    let page = listing(params)
        .fetch_page::<Affaire>(pool, params.page, params.limit)
        .await?;
    Ok(page.map(AffaireResponse::from))
}

/// Every affaire matching the filters, for exports.
pub async fn list_all(pool: &Pool<Postgres>, params: &AffaireListParams) -> Result<Vec<Affaire>, AppError> {
    listing(params).fetch_all(pool).await
}

/// Partial update. Only non-None fields are changed.
pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateAffaireRequest,
) -> Result<Option<Affaire>, AppError> {
    sqlx::query_as::<_, Affaire>(
        r#"
        UPDATE affaires SET
            intitule = COALESCE($2, intitule),
            nature = COALESCE($3, nature),
            juridiction = COALESCE($4, juridiction),
            client_nom = COALESCE($5, client_nom),
            partie_adverse = COALESCE($6, partie_adverse),
            avocat_adverse = COALESCE($7, avocat_adverse),
            date_ouverture = COALESCE($8, date_ouverture),
            observations = COALESCE($9, observations),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.intitule.as_deref().map(str::trim))
    .bind(req.nature.as_deref())
    .bind(req.juridiction.as_deref().map(str::trim))
    .bind(req.client_nom.as_deref().map(str::trim))
    .bind(req.partie_adverse.as_deref())
    .bind(req.avocat_adverse.as_deref())
    .bind(req.date_ouverture)
    .bind(req.observations.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Change the status. Closing statuses stamp `date_cloture` (keeping an
/// earlier stamp); any other status clears it.
pub async fn update_statut(
    pool: &Pool<Postgres>,
    id: Uuid,
    statut: &str,
) -> Result<Option<Affaire>, AppError> {
    sqlx::query_as::<_, Affaire>(
        r#"
        UPDATE affaires SET
            statut = $2,
            date_cloture = CASE WHEN $3 THEN COALESCE(date_cloture, CURRENT_DATE) ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(statut)
    .bind(affaire_statut_closes(statut))
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM affaires WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

pub async fn statistiques(pool: &Pool<Postgres>) -> Result<AffaireStatistiques, AppError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM affaires")
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let par_statut = sqlx::query_as::<_, CountByLabel>(
        "SELECT statut AS label, COUNT(*) AS count FROM affaires GROUP BY statut ORDER BY statut",
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let par_nature = sqlx::query_as::<_, CountByLabel>(
        "SELECT nature AS label, COUNT(*) AS count FROM affaires GROUP BY nature ORDER BY nature",
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let audiences_a_venir = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM audiences
        WHERE statut = 'programmee' AND date_audience >= CURRENT_DATE
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(AffaireStatistiques {
        total,
        par_statut,
        par_nature,
        audiences_a_venir,
    })
}

/// Fees, expenses and hearings of one affaire.
pub async fn synthese(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<AffaireSynthese>, AppError> {
    let Some(affaire) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    let (convenus, encaisses, depenses, nombre_audiences) =
        sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                COALESCE((SELECT SUM(montant_convenu) FROM honoraires_contentieux
                          WHERE affaire_id = $1), 0)::BIGINT,
                COALESCE((SELECT SUM(p.montant) FROM paiements_honoraires_contentieux p
                          JOIN honoraires_contentieux h ON h.id = p.honoraires_id
                          WHERE h.affaire_id = $1), 0)::BIGINT,
                COALESCE((SELECT SUM(montant) FROM depenses_affaires
                          WHERE affaire_id = $1), 0)::BIGINT,
                (SELECT COUNT(*) FROM audiences WHERE affaire_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let prochaine_audience = sqlx::query_as::<_, Audience>(
        r#"
        SELECT * FROM audiences
        WHERE affaire_id = $1 AND statut = 'programmee' AND date_audience >= $2
        ORDER BY date_audience ASC, heure ASC NULLS LAST
        LIMIT 1
        "#,
    )
    .bind(id)
    .bind(Utc::now().date_naive())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(Some(AffaireSynthese {
        affaire: AffaireResponse::from(affaire),
        honoraires_convenus: convenus,
        honoraires_encaisses: encaisses,
        honoraires_reste: money::reste(convenus, encaisses),
        total_depenses: depenses,
        nombre_audiences,
        prochaine_audience,
    }))
}
