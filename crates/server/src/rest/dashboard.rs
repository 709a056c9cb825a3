use axum::{extract::State, Json};
use sqlx::{Pool, Postgres};

use shared_types::{AppError, TableauDeBord};

use crate::auth::extractors::AuthRequired;

/// GET /api/tableau-de-bord
#[utoipa::path(
    get,
    path = "/api/tableau-de-bord",
    responses(
        (status = 200, description = "Home screen figures across every activity", body = TableauDeBord),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "tableau-de-bord"
)]
#[tracing::instrument(skip(pool))]
pub async fn tableau_de_bord(
    State(pool): State<Pool<Postgres>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<TableauDeBord>, AppError> {
    Ok(Json(crate::repo::dashboard::tableau_de_bord(&pool).await?))
}
