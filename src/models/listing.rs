//! Query parameters and envelopes shared by the admin data tables.
//!
//! Every admin listing accepts `?page=&per_page=&sort=&order=&search=`.
//! Sorting is restricted to a per-table whitelist of columns; anything else
//! falls back to the table's default order.

use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub search: Option<String>,
    /// Table-specific status filter (payment status for registrants)
    pub status: Option<String>,
}

/// Sortable column: public name in the query string, SQL expression in the
/// listing query.
pub type SortColumn = (&'static str, &'static str);

impl ListQuery {
    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }

    /// `ORDER BY` body built only from whitelisted columns.
    ///
    /// The first entry of `columns` is the default sort.
    pub fn order_by(&self, columns: &[SortColumn]) -> String {
        let column = self
            .sort
            .as_deref()
            .and_then(|requested| columns.iter().find(|(name, _)| *name == requested))
            .or_else(|| columns.first())
            .map(|(_, expr)| *expr)
            .unwrap_or("created_at");

        format!("{} {}", column, self.order.unwrap_or_default().as_sql())
    }

    /// `ILIKE` pattern for the search box, with wildcards in the input escaped.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }

        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{escaped}%"))
    }

    pub fn status_filter(&self) -> Option<String> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .map(str::to_uppercase)
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &ListQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[SortColumn] = &[("created_at", "c.created_at"), ("email", "c.email")];

    #[test]
    fn defaults_to_first_page_of_twenty() {
        let query = ListQuery::default();

        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 20);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn clamps_page_size_and_computes_offset() {
        let query = ListQuery {
            page: Some(3),
            per_page: Some(500),
            ..Default::default()
        };

        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 200);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let query = ListQuery {
            page: Some(0),
            ..Default::default()
        };

        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn sorts_only_by_whitelisted_columns() {
        let allowed = ListQuery {
            sort: Some("email".to_string()),
            order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let injected = ListQuery {
            sort: Some("email; DROP TABLE users".to_string()),
            ..Default::default()
        };

        assert_eq!(allowed.order_by(COLUMNS), "c.email ASC");
        assert_eq!(injected.order_by(COLUMNS), "c.created_at DESC");
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let query = ListQuery {
            search: Some(" 100%_done ".to_string()),
            ..Default::default()
        };

        assert_eq!(query.search_pattern().as_deref(), Some("%100\\%\\_done%"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = ListQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };

        assert_eq!(query.search_pattern(), None);
    }
}
