//! Generic list query engine
//!
//! Turns raw `page`/`limit`/`search`/`search_by`/`sort_by`/`sort_order` query
//! parameters into a [`ResolvedQuery`] bound to one resource's allow-lists.
//! Only allow-listed column names are ever interpolated into SQL; the search
//! term always travels as a bound parameter.
//!
//! Two entry points exist on purpose:
//! - [`ListQuery::validate`] is strict and is what HTTP handlers call, so a bad
//!   `sort_by` yields a 400 with the allowed values.
//! - [`ListQuery::resolve`] never fails and falls back to defaults, so callers
//!   that skip validation still produce a safe query.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{Result, RuuError};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest page size a list request may ask for
pub const MAX_LIMIT: u32 = 100;
pub const DEFAULT_SORT_FIELD: &str = "created_at";

/// A resource that can be listed through the query engine
pub trait Listable {
    /// Backing table name
    const TABLE: &'static str;
    /// Columns accepted by `sort_by`
    const SORTABLE: &'static [&'static str];
    /// Columns accepted by `search_by`; a search without `search_by` spans all of them
    const SEARCHABLE: &'static [&'static str];

    /// Primary key, used as the ordering tie-breaker
    fn key(&self) -> Uuid;

    /// Value of an allow-listed column, for in-process evaluation
    fn column_value(&self, column: &str) -> Option<ColumnValue<'_>>;
}

/// Column value as seen by the in-process evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnValue<'a> {
    Text(&'a str),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse the exact lowercase tokens `asc` and `desc`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw list parameters as received on the query string
///
/// Every field is kept as text so that malformed numbers fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number, 1-based (default 1)
    #[param(value_type = Option<u32>, example = 1)]
    pub page: Option<String>,
    /// Page size (default 10, at most 100)
    #[param(value_type = Option<u32>, example = 10)]
    pub limit: Option<String>,
    /// Case-insensitive substring to search for
    pub search: Option<String>,
    /// Restrict the search to one column
    pub search_by: Option<String>,
    /// Column to sort by (default created_at)
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default desc)
    pub sort_order: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(value: &Option<String>, default: u32) -> u32 {
    present(value)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

impl ListQuery {
    /// Reject `search_by`, `sort_by` or `sort_order` values outside the
    /// allow-lists, and numeric `limit` values above [`MAX_LIMIT`]
    pub fn validate<R: Listable>(&self) -> Result<()> {
        if let Some(limit) = present(&self.limit).and_then(|v| v.parse::<u64>().ok()) {
            if limit > u64::from(MAX_LIMIT) {
                return Err(RuuError::validation(format!(
                    "Invalid limit parameter. Maximum is {MAX_LIMIT}"
                )));
            }
        }

        if let Some(search_by) = present(&self.search_by) {
            if !R::SEARCHABLE.contains(&search_by) {
                return Err(RuuError::validation(format!(
                    "Invalid search_by parameter. Allowed values: {}",
                    R::SEARCHABLE.join(", ")
                )));
            }
        }

        if let Some(sort_by) = present(&self.sort_by) {
            if !R::SORTABLE.contains(&sort_by) {
                return Err(RuuError::validation(format!(
                    "Invalid sort_by parameter. Allowed values: {}",
                    R::SORTABLE.join(", ")
                )));
            }
        }

        if let Some(sort_order) = present(&self.sort_order) {
            if SortOrder::parse(sort_order).is_none() {
                return Err(RuuError::validation(
                    "Invalid sort_order parameter. Allowed values: asc, desc",
                ));
            }
        }

        Ok(())
    }

    /// Resolve parameters against a resource, substituting defaults for
    /// anything missing or invalid
    pub fn resolve<R: Listable>(&self) -> ResolvedQuery {
        let search = present(&self.search).map(str::to_string);

        let search_columns = match present(&self.search_by) {
            Some(requested) => match R::SEARCHABLE.iter().find(|c| **c == requested) {
                Some(column) => vec![*column],
                None => R::SEARCHABLE.to_vec(),
            },
            None => R::SEARCHABLE.to_vec(),
        };

        let sort_by = present(&self.sort_by)
            .and_then(|requested| R::SORTABLE.iter().copied().find(|c| *c == requested))
            .unwrap_or(DEFAULT_SORT_FIELD);

        let sort_order = present(&self.sort_order)
            .and_then(SortOrder::parse)
            .unwrap_or_default();

        ResolvedQuery {
            page: parse_positive(&self.page, DEFAULT_PAGE),
            limit: parse_positive(&self.limit, DEFAULT_LIMIT).min(MAX_LIMIT),
            search,
            search_columns,
            sort_by,
            sort_order,
        }
    }
}

/// A validated, resource-bound list plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub search_columns: Vec<&'static str>,
    pub sort_by: &'static str,
    pub sort_order: SortOrder,
}

impl ResolvedQuery {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1).saturating_mul(i64::from(self.limit))
    }

    /// ILIKE pattern for the search term with `%`, `_` and `\` escaped
    pub fn like_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|term| format!("%{}%", escape_like(term)))
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(self.page, self.limit, total)
    }

    /// Append ` AND (col ILIKE $n OR ...)` when a search term is present
    ///
    /// The builder must already contain a `WHERE` clause.
    pub fn push_search(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let Some(pattern) = self.like_pattern() else {
            return;
        };

        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in &self.search_columns {
            separated.push(format!("{column} ILIKE "));
            separated.push_bind_unseparated(pattern.clone());
        }
        separated.push_unseparated(")");
    }

    /// Append ordering (with uuid tie-breaker) and the page window
    pub fn push_order_and_page(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let direction = self.sort_order.as_sql();
        builder.push(format!(
            " ORDER BY {} {direction}, uuid {direction} LIMIT ",
            self.sort_by
        ));
        builder.push_bind(i64::from(self.limit));
        builder.push(" OFFSET ");
        builder.push_bind(self.offset());
    }

    /// Whether an item satisfies the search filter
    pub fn matches<R: Listable>(&self, item: &R) -> bool {
        let Some(term) = self.search.as_deref() else {
            return true;
        };
        let needle = term.to_lowercase();

        self.search_columns
            .iter()
            .any(|column| match item.column_value(column) {
                Some(ColumnValue::Text(text)) => text.to_lowercase().contains(&needle),
                _ => false,
            })
    }

    /// Ordering between two items under this plan
    pub fn compare<R: Listable>(&self, a: &R, b: &R) -> Ordering {
        let ordering = a
            .column_value(self.sort_by)
            .cmp(&b.column_value(self.sort_by))
            .then_with(|| a.key().cmp(&b.key()));

        match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Evaluate the plan over an in-memory collection
    pub fn apply<R: Listable>(&self, items: impl IntoIterator<Item = R>) -> (Vec<R>, PaginationMeta) {
        let mut matched: Vec<R> = items.into_iter().filter(|item| self.matches(item)).collect();
        matched.sort_by(|a, b| self.compare(a, b));

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(self.limit as usize)
            .collect();

        (page, self.meta(total))
    }
}

/// Escape LIKE metacharacters so the term matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Pagination metadata returned alongside list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 42)]
    pub total: i64,
    #[schema(example = 5)]
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_wide = i64::from(limit.max(1));
        let total_pages = if total <= 0 {
            0
        } else {
            (total + limit_wide - 1) / limit_wide
        };

        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}
