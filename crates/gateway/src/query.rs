//! Query-string builder for the row-oriented REST dialect.
//!
//! Renders `select`, `eq.` filters, multi-column `order` and
//! `offset`/`limit` into query pairs, and parses the total count out of a
//! `Content-Range` header.

use wasura_core::record::{Collection, SortDirection};

/// A list/select request against one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    filters: Vec<(String, String)>,
    order: Vec<(String, SortDirection)>,
    offset: Option<u64>,
    limit: Option<u64>,
    count_exact: bool,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query with the collection's default ordering applied.
    pub fn for_collection(collection: Collection) -> Self {
        collection
            .default_order()
            .iter()
            .fold(Self::new(), |q, (column, dir)| q.order_by(column, *dir))
    }

    /// Add an equality filter (`column=eq.value`).
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    /// Restrict to a window and ask the backend for the exact total.
    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self.count_exact = true;
        self
    }

    /// Whether the `Prefer: count=exact` header should be sent.
    pub fn wants_count(&self) -> bool {
        self.count_exact
    }

    /// Render as query pairs, `select=*` first.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];

        pairs.extend(
            self.filters
                .iter()
                .map(|(column, value)| (column.clone(), format!("eq.{value}"))),
        );

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, dir)| format!("{column}.{}", dir.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }
}

/// Filter pair selecting one row by id.
pub fn id_filter(id: &str) -> Vec<(String, String)> {
    vec![("id".to_string(), format!("eq.{id}"))]
}

/// Total row count from a `Content-Range` header (`0-5/42`, `*/0`).
///
/// Returns `None` when the total is unknown (`*`) or the header is malformed.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
