use axum::{extract::Query, Json};

use shared_types::{SearchParams, SearchResponse};

use crate::auth::extractors::AuthRequired;

/// GET /api/recherche?q=...&types=affaire,facture&limit=20
///
/// A blank query, or a server running without the search index, yields no hits.
#[utoipa::path(
    get,
    path = "/api/recherche",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching records across entity types", body = SearchResponse)
    ),
    tag = "recherche"
)]
#[tracing::instrument(skip(params), fields(q = %params.q))]
pub async fn recherche(
    AuthRequired(claims): AuthRequired,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Json(SearchResponse { query, results: Vec::new() });
    }

    let results = match crate::search::get_search() {
        Some(index) => index.search(&query, &params.entity_types(), params.limit()),
        None => {
            tracing::debug!("Search index disabled");
            Vec::new()
        }
    };

    Json(SearchResponse { query, results })
}
