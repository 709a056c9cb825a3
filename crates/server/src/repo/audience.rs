use chrono::{Duration, NaiveDate, Utc};
use shared_types::{
    statut_apres_resultat, AppError, Audience, AudienceCalendrier, AudienceListParams,
    CreateAudienceRequest, CreateResultatRequest, PaginatedResponse, ResultatAudience,
    ResultatResponse, UpdateAudienceRequest,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::pagination::Listing;

pub async fn create(pool: &Pool<Postgres>, req: &CreateAudienceRequest) -> Result<Audience, AppError> {
    sqlx::query_as::<_, Audience>(
        r#"
        INSERT INTO audiences
            (affaire_id, date_audience, heure, juridiction, salle, objet, statut, notes)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'programmee'), $8)
        RETURNING *
        "#,
    )
    .bind(req.affaire_id)
    .bind(req.date_audience)
    .bind(req.heure)
    .bind(req.juridiction.trim())
    .bind(req.salle.as_deref())
    .bind(req.objet.trim())
    .bind(req.statut.as_deref())
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Audience>, AppError> {
    sqlx::query_as::<_, Audience>("SELECT * FROM audiences WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(
    pool: &Pool<Postgres>,
    params: &AudienceListParams,
) -> Result<PaginatedResponse<Audience>, AppError> {
    Listing::new("audiences", "*")
        .search(&["objet", "juridiction", "salle"], params.q.as_deref())
        .eq("affaire_id", params.affaire_id)
        .eq("statut", params.statut.clone())
        .gte("date_audience", params.du)
        .lte("date_audience", params.au)
        .order_by("date_audience DESC, heure DESC NULLS LAST")
        .fetch_page(pool, params.page, params.limit)
        .await
}

pub async fn list_by_affaire(pool: &Pool<Postgres>, affaire_id: Uuid) -> Result<Vec<Audience>, AppError> {
    sqlx::query_as::<_, Audience>(
        r#"
        SELECT * FROM audiences
        WHERE affaire_id = $1
        ORDER BY date_audience ASC, heure ASC NULLS LAST
        "#,
    )
    .bind(affaire_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// All hearings between `du` and `au` inclusive, with their affaire.
pub async fn calendrier(
    pool: &Pool<Postgres>,
    du: NaiveDate,
    au: NaiveDate,
) -> Result<Vec<AudienceCalendrier>, AppError> {
    sqlx::query_as::<_, AudienceCalendrier>(
        r#"
        SELECT a.*, af.reference AS affaire_reference, af.intitule AS affaire_intitule
        FROM audiences a
        JOIN affaires af ON af.id = a.affaire_id
        WHERE a.date_audience BETWEEN $1 AND $2
        ORDER BY a.date_audience ASC, a.heure ASC NULLS LAST
        "#,
    )
    .bind(du)
    .bind(au)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Programmed hearings from today to today + `jours`.
pub async fn a_venir(pool: &Pool<Postgres>, jours: i64) -> Result<Vec<AudienceCalendrier>, AppError> {
    let today = Utc::now().date_naive();
    sqlx::query_as::<_, AudienceCalendrier>(
        r#"
        SELECT a.*, af.reference AS affaire_reference, af.intitule AS affaire_intitule
        FROM audiences a
        JOIN affaires af ON af.id = a.affaire_id
        WHERE a.statut = 'programmee' AND a.date_audience BETWEEN $1 AND $2
        ORDER BY a.date_audience ASC, a.heure ASC NULLS LAST
        "#,
    )
    .bind(today)
    .bind(today + Duration::days(jours))
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateAudienceRequest,
) -> Result<Option<Audience>, AppError> {
    sqlx::query_as::<_, Audience>(
        r#"
        UPDATE audiences SET
            date_audience = COALESCE($2, date_audience),
            heure = COALESCE($3, heure),
            juridiction = COALESCE($4, juridiction),
            salle = COALESCE($5, salle),
            objet = COALESCE($6, objet),
            statut = COALESCE($7, statut),
            notes = COALESCE($8, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.date_audience)
    .bind(req.heure)
    .bind(req.juridiction.as_deref().map(str::trim))
    .bind(req.salle.as_deref())
    .bind(req.objet.as_deref().map(str::trim))
    .bind(req.statut.as_deref())
    .bind(req.notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM audiences WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() > 0)
}

// ── Résultats ───────────────────────────────────────────────────

/// Record the outcome of a hearing.
///
/// In one transaction: the hearing row is locked, the outcome inserted, the
/// hearing status derived from the outcome type, and for a `renvoi` the
/// follow-up hearing is created and linked.
pub async fn create_resultat(
    pool: &Pool<Postgres>,
    audience_id: Uuid,
    req: &CreateResultatRequest,
) -> Result<ResultatResponse, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let audience = sqlx::query_as::<_, Audience>("SELECT * FROM audiences WHERE id = $1 FOR UPDATE")
        .bind(audience_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .ok_or_else(|| AppError::not_found(format!("Audience {} not found", audience_id)))?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM resultats_audience WHERE audience_id = $1",
    )
    .bind(audience_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    if existing > 0 {
        return Err(AppError::conflict("This hearing already has a recorded outcome"));
    }

    req.check(audience.date_audience)
        .map_err(|(field, message)| AppError::invalid_field(field, message))?;

    let audience_suivante = match (req.type_resultat.as_str(), req.date_prochaine_audience) {
        ("renvoi", Some(date)) => Some(
            sqlx::query_as::<_, Audience>(
                r#"
                INSERT INTO audiences
                    (affaire_id, date_audience, heure, juridiction, salle, objet, statut)
                VALUES ($1, $2, $3, $4, $5, $6, 'programmee')
                RETURNING *
                "#,
            )
            .bind(audience.affaire_id)
            .bind(date)
            .bind(req.heure_prochaine_audience.or(audience.heure))
            .bind(&audience.juridiction)
            .bind(audience.salle.as_deref())
            .bind(&audience.objet)
            .fetch_one(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_app_error)?,
        ),
        _ => None,
    };

    let resultat = sqlx::query_as::<_, ResultatAudience>(
        r#"
        INSERT INTO resultats_audience
            (audience_id, type_resultat, decision, date_prochaine_audience,
             date_delibere, audience_suivante_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(audience_id)
    .bind(&req.type_resultat)
    .bind(req.decision.as_deref())
    .bind(req.date_prochaine_audience)
    .bind(req.date_delibere)
    .bind(audience_suivante.as_ref().map(|a| a.id))
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query("UPDATE audiences SET statut = $2, updated_at = NOW() WHERE id = $1")
        .bind(audience_id)
        .bind(statut_apres_resultat(&req.type_resultat))
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(ResultatResponse {
        resultat,
        audience_suivante,
    })
}

pub async fn find_resultat_by_audience(
    pool: &Pool<Postgres>,
    audience_id: Uuid,
) -> Result<Option<ResultatAudience>, AppError> {
    sqlx::query_as::<_, ResultatAudience>("SELECT * FROM resultats_audience WHERE audience_id = $1")
        .bind(audience_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Remove an outcome and put its hearing back to `programmee`.
/// A follow-up hearing created by a `renvoi` is kept.
pub async fn delete_resultat(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let audience_id = sqlx::query_scalar::<_, Uuid>(
        "DELETE FROM resultats_audience WHERE id = $1 RETURNING audience_id",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let Some(audience_id) = audience_id else {
        return Ok(false);
    };

    sqlx::query("UPDATE audiences SET statut = 'programmee', updated_at = NOW() WHERE id = $1")
        .bind(audience_id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(true)
}
