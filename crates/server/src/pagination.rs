//! Paginated, filterable list queries.
//!
//! Table, column and ORDER BY fragments are `&'static str` supplied by the
//! repositories; user input only ever reaches the query as bound parameters.

use chrono::NaiveDate;
use shared_types::{normalize_pagination, normalize_search, page_offset, AppError, PaginatedResponse};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// A bound filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Bool(bool),
    Int(i64),
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        FilterValue::Uuid(v)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        FilterValue::Date(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Eq,
    Gte,
    Lte,
}

impl Op {
    fn sql(self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Gte => " >= ",
            Op::Lte => " <= ",
        }
    }
}

#[derive(Debug, Clone)]
struct Filter {
    column: &'static str,
    op: Op,
    value: FilterValue,
}

/// Escape `%`, `_` and `\` in a user term and wrap it for a contains match.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Builder for a `COUNT(*)` + page query over one table (or join).
#[derive(Debug, Clone)]
pub struct Listing {
    from: &'static str,
    columns: &'static str,
    search_columns: &'static [&'static str],
    search: Option<String>,
    filters: Vec<Filter>,
    order_by: &'static str,
}

impl Listing {
    pub fn new(from: &'static str, columns: &'static str) -> Self {
        Self {
            from,
            columns,
            search_columns: &[],
            search: None,
            filters: Vec::new(),
            order_by: "created_at DESC",
        }
    }

    /// Case-insensitive contains match of `q` over `columns` (OR-ed).
    /// Blank terms are ignored.
    pub fn search(mut self, columns: &'static [&'static str], q: Option<&str>) -> Self {
        self.search_columns = columns;
        self.search = normalize_search(q);
        self
    }

    fn filter(mut self, column: &'static str, op: Op, value: Option<impl Into<FilterValue>>) -> Self {
        if let Some(v) = value {
            self.filters.push(Filter {
                column,
                op,
                value: v.into(),
            });
        }
        self
    }

    /// `column = value` when `value` is present.
    pub fn eq(self, column: &'static str, value: Option<impl Into<FilterValue>>) -> Self {
        self.filter(column, Op::Eq, value)
    }

    /// `column >= value` when `value` is present.
    pub fn gte(self, column: &'static str, value: Option<impl Into<FilterValue>>) -> Self {
        self.filter(column, Op::Gte, value)
    }

    /// `column <= value` when `value` is present.
    pub fn lte(self, column: &'static str, value: Option<impl Into<FilterValue>>) -> Self {
        self.filter(column, Op::Lte, value)
    }

    pub fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = order_by;
        self
    }

    fn push_where<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>) {
        let mut first = true;
        let mut keyword = |qb: &mut QueryBuilder<'a, Postgres>| {
            qb.push(if first { " WHERE " } else { " AND " });
            first = false;
        };

        for f in &self.filters {
            keyword(qb);
            qb.push(f.column).push(f.op.sql());
            match &f.value {
                FilterValue::Text(v) => qb.push_bind(v.as_str()),
                FilterValue::Uuid(v) => qb.push_bind(*v),
                FilterValue::Date(v) => qb.push_bind(*v),
                FilterValue::Bool(v) => qb.push_bind(*v),
                FilterValue::Int(v) => qb.push_bind(*v),
            };
        }

        if let Some(term) = &self.search {
            if !self.search_columns.is_empty() {
                keyword(qb);
                let pattern = like_pattern(term);
                qb.push("(");
                for (i, col) in self.search_columns.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(*col)
                        .push(" ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" ESCAPE '\\'");
                }
                qb.push(")");
            }
        }
    }

    fn count_query(&self) -> QueryBuilder<'_, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.from);
        self.push_where(&mut qb);
        qb
    }

    fn page_query(&self, limit: i64, offset: i64) -> QueryBuilder<'_, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns).push(" FROM ").push(self.from);
        self.push_where(&mut qb);
        qb.push(" ORDER BY ")
            .push(self.order_by)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        qb
    }

    /// Run the count and page queries. `page`/`limit` are normalized first.
    pub async fn fetch_page<T>(
        &self,
        pool: &Pool<Postgres>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<PaginatedResponse<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let (page, limit) = normalize_pagination(page, limit);

        let total: i64 = self
            .count_query()
            .build_query_scalar()
            .fetch_one(pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        let rows: Vec<T> = self
            .page_query(limit, page_offset(page, limit))
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

        Ok(PaginatedResponse::new(rows, page, limit, total))
    }

    /// Every matching row, unpaginated (exports).
    pub async fn fetch_all<T>(&self, pool: &Pool<Postgres>) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns).push(" FROM ").push(self.from);
        self.push_where(&mut qb);
        qb.push(" ORDER BY ").push(self.order_by);
        qb.build_query_as()
            .fetch_all(pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kone"), "%kone%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }

    #[test]
    fn bare_listing() {
        let listing = Listing::new("affaires", "*");
        assert_eq!(listing.count_query().sql(), "SELECT COUNT(*) FROM affaires");
        assert_eq!(
            listing.page_query(20, 0).sql(),
            "SELECT * FROM affaires ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn filters_and_search_are_bound() {
        let listing = Listing::new("affaires", "id, reference")
            .search(&["reference", "intitule"], Some(" plateau "))
            .eq("statut", Some("en_cours"))
            .eq("nature", None::<String>)
            .order_by("date_ouverture DESC");

        assert_eq!(
            listing.count_query().sql(),
            "SELECT COUNT(*) FROM affaires WHERE statut = $1 AND \
             (reference ILIKE $2 ESCAPE '\\' OR intitule ILIKE $3 ESCAPE '\\')"
        );
        assert_eq!(
            listing.page_query(10, 20).sql(),
            "SELECT id, reference FROM affaires WHERE statut = $1 AND \
             (reference ILIKE $2 ESCAPE '\\' OR intitule ILIKE $3 ESCAPE '\\') \
             ORDER BY date_ouverture DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn blank_search_adds_nothing() {
        let listing = Listing::new("lots", "*").search(&["numero"], Some("   "));
        assert_eq!(listing.count_query().sql(), "SELECT COUNT(*) FROM lots");
    }

    #[test]
    fn range_filters() {
        let du = NaiveDate::from_ymd_opt(2025, 1, 1);
        let au = NaiveDate::from_ymd_opt(2025, 1, 31);
        let listing = Listing::new("audiences", "*")
            .gte("date_audience", du)
            .lte("date_audience", au)
            .eq("affaire_id", Some(Uuid::nil()));
        assert_eq!(
            listing.count_query().sql(),
            "SELECT COUNT(*) FROM audiences WHERE date_audience >= $1 \
             AND date_audience <= $2 AND affaire_id = $3"
        );
    }
}
