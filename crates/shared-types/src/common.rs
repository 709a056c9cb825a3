use serde::{Deserialize, Serialize};

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            1
        };
        let has_next = page < total_pages;
        let has_prev = page > 1;

        Self {
            data: items,
            meta: PaginationMeta {
                page,
                limit,
                total,
                total_pages,
                has_next,
                has_prev,
            },
        }
    }

    /// Convert every item while keeping the pagination metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number for which the row offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// Helper to normalize pagination params with safe defaults.
pub fn normalize_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

/// Offset of the first row of `page` (1-based).
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(limit)
}

/// Trim a free-text search term; blank terms are treated as absent.
pub fn normalize_search(q: Option<&str>) -> Option<String> {
    q.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Generic message response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

/// A `(label, count)` pair used in breakdowns by status or category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct CountByLabel {
    pub label: String,
    pub count: i64,
}

/// Check a value against a closed vocabulary and build the 400 message.
pub fn check_vocabulary(field: &str, value: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Invalid {}: {}. Valid values: {}",
            field,
            value,
            allowed.join(", ")
        ))
    }
}

/// Body of every `PATCH .../statut` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateStatutRequest {
    pub statut: String,
}

/// Payment methods shared by every payment table.
pub const MODES_PAIEMENT: &[&str] = &["especes", "cheque", "virement", "mobile_money", "autre"];

pub fn is_valid_mode_paiement(s: &str) -> bool {
    MODES_PAIEMENT.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_computes_pages() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 2, 3, 7);
        assert_eq!(page.meta.total_pages, 3);
        assert!(page.meta.has_next);
        assert!(page.meta.has_prev);

        let last = PaginatedResponse::new(vec![7], 3, 3, 7);
        assert!(!last.meta.has_next);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 1, 20, 0);
        assert_eq!(page.meta.total_pages, 0);
        assert!(!page.meta.has_next);
        assert!(!page.meta.has_prev);
    }

    #[test]
    fn normalize_pagination_clamps() {
        assert_eq!(normalize_pagination(None, None), (1, 20));
        assert_eq!(normalize_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_pagination(Some(-4), Some(500)), (1, 100));
        assert_eq!(normalize_pagination(Some(3), Some(50)), (3, 50));
    }

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let (page, limit) = normalize_pagination(Some(i64::MAX), Some(100));
        assert_eq!(page, MAX_PAGE);
        assert!(page_offset(page, limit) > 0);
        assert_eq!(page_offset(i64::MAX, i64::MAX), i64::MAX);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(Some("  kone ")), Some("kone".to_string()));
    }

    #[test]
    fn vocabulary_check_lists_valid_values() {
        assert!(check_vocabulary("mode_paiement", "cheque", MODES_PAIEMENT).is_ok());
        let err = check_vocabulary("mode_paiement", "bitcoin", MODES_PAIEMENT).unwrap_err();
        assert!(err.contains("Invalid mode_paiement: bitcoin"));
        assert!(err.contains("mobile_money"));
    }

    #[test]
    fn map_keeps_meta() {
        let page = PaginatedResponse::new(vec![1, 2], 1, 2, 5).map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.meta.total, 5);
    }
}
