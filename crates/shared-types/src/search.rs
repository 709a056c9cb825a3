use serde::{Deserialize, Serialize};

/// Entity types held in the global search index.
pub const SEARCH_ENTITY_TYPES: &[&str] = &[
    "affaire",
    "dossier_recouvrement",
    "immeuble",
    "locataire",
    "client_conseil",
    "facture",
];

pub const SEARCH_DEFAULT_LIMIT: usize = 20;
pub const SEARCH_MAX_LIMIT: usize = 100;

/// A single hit returned by the global full-text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResult {
    pub id: String,
    pub entity_type: String,
    pub title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Comma-separated entity types to keep, e.g. `affaire,facture`.
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchParams {
    /// Requested entity types that the index knows about. Empty means all.
    pub fn entity_types(&self) -> Vec<String> {
        self.types
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| SEARCH_ENTITY_TYPES.contains(t))
            .map(str::to_string)
            .collect()
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(SEARCH_DEFAULT_LIMIT)
            .clamp(1, SEARCH_MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_filter_ignores_unknown() {
        let params = SearchParams {
            q: "kone".into(),
            types: Some(" affaire, facture ,judge".into()),
            limit: None,
        };
        assert_eq!(params.entity_types(), vec!["affaire", "facture"]);
        assert!(SearchParams::default().entity_types().is_empty());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(SearchParams::default().limit(), 20);
        let mut params = SearchParams::default();
        params.limit = Some(0);
        assert_eq!(params.limit(), 1);
        params.limit = Some(1000);
        assert_eq!(params.limit(), 100);
    }
}
