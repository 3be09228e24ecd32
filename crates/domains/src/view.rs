//! # Collection views
//!
//! Declarative list/search/filter configuration per collection, plus the
//! query model the generic CRUD engine evaluates against it.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{FieldError, Result, ValidationErrors};
use crate::record::{FieldKind, FieldValue, Record};

/// Sort order applied before pagination.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub field: &'static str,
    pub descending: bool,
}

/// What a list page shows and which fields it can search and filter on.
#[derive(Debug, Clone, Copy)]
pub struct CollectionView {
    /// URL segment, e.g. `datasets`
    pub slug: &'static str,
    /// Page heading, e.g. `Datasets`
    pub label: &'static str,
    /// Columns of the list table, in order
    pub columns: &'static [&'static str],
    pub searchable: &'static [&'static str],
    pub filterable: &'static [&'static str],
    /// Fields left out of list tables and forms
    pub hidden: &'static [&'static str],
    pub sort: Option<SortKey>,
}

impl CollectionView {
    pub fn is_hidden(&self, field: &str) -> bool {
        self.hidden.contains(&field)
    }
}

/// Admin view of datasets.
pub const DATASET_ADMIN_VIEW: CollectionView = CollectionView {
    slug: "datasets",
    label: "Datasets",
    columns: &[
        "name",
        "data_type",
        "phases",
        "topic",
        "published",
        "task_type",
        "data_source",
        "approved",
    ],
    searchable: &["name", "description", "reference", "published"],
    filterable: &["name", "topic", "data_type", "published", "approved"],
    hidden: &["slug"],
    sort: Some(SortKey { field: "name", descending: false }),
};

/// Admin view of feedback.
pub const FEEDBACK_ADMIN_VIEW: CollectionView = CollectionView {
    slug: "feedback",
    label: "Feedback",
    columns: &[
        "timestamp",
        "first_name",
        "last_name",
        "email",
        "subject",
        "message",
        "response",
        "replied",
    ],
    searchable: &["first_name", "last_name", "email", "subject", "message", "response"],
    filterable: &[
        "first_name",
        "last_name",
        "email",
        "subject",
        "message",
        "response",
        "timestamp",
    ],
    hidden: &[],
    sort: Some(SortKey { field: "timestamp", descending: true }),
};

/// Public catalog of datasets. Callers add the `approved` filter.
pub const DATASET_CATALOG_VIEW: CollectionView = CollectionView {
    slug: "datasets",
    label: "Datasets",
    columns: &["name", "data_type", "topic", "published"],
    searchable: &["name", "description", "topic", "data_type", "task_type", "phases"],
    filterable: &["topic", "data_type", "approved"],
    hidden: &["slug"],
    sort: Some(SortKey { field: "name", descending: false }),
};

/// One filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Case-insensitive equality; for tags, any tag equal
    Equals(String),
    NotEquals(String),
    /// Case-insensitive substring
    Contains(String),
    /// `true` keeps blank values, `false` keeps non-blank ones
    Empty(bool),
    After(DateTime<Utc>),
    Before(DateTime<Utc>),
}

impl FilterOp {
    pub fn code(&self) -> &'static str {
        match self {
            FilterOp::Equals(_) => "eq",
            FilterOp::NotEquals(_) => "ne",
            FilterOp::Contains(_) => "contains",
            FilterOp::Empty(_) => "empty",
            FilterOp::After(_) => "gt",
            FilterOp::Before(_) => "lt",
        }
    }

    pub fn argument(&self) -> String {
        match self {
            FilterOp::Equals(v) | FilterOp::NotEquals(v) | FilterOp::Contains(v) => v.clone(),
            FilterOp::Empty(b) => b.to_string(),
            FilterOp::After(t) | FilterOp::Before(t) => t.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static str,
    pub op: FilterOp,
}

impl Filter {
    pub fn new(field: &'static str, op: FilterOp) -> Self {
        Self { field, op }
    }

    /// The query-string parameter that reproduces this filter.
    pub fn param(&self) -> (String, String) {
        (format!("flt_{}_{}", self.field, self.op.code()), self.op.argument())
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let value = record.value(self.field);
        match &self.op {
            FilterOp::Equals(expected) => equals(&value, expected),
            FilterOp::NotEquals(expected) => !equals(&value, expected),
            FilterOp::Contains(needle) => contains(&value, &needle.to_lowercase()),
            FilterOp::Empty(want_blank) => value.is_blank() == *want_blank,
            FilterOp::After(t) => matches!(value, FieldValue::Time(Some(v)) if v > *t),
            FilterOp::Before(t) => matches!(value, FieldValue::Time(Some(v)) if v < *t),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn equals(value: &FieldValue<'_>, expected: &str) -> bool {
    match value {
        FieldValue::Text(s) => s.trim().eq_ignore_ascii_case(expected.trim()),
        FieldValue::Tags(tags) => tags.iter().any(|t| t.trim().eq_ignore_ascii_case(expected.trim())),
        FieldValue::Flag(b) => parse_flag(expected) == Some(*b),
        // A bare date matches any time on that day.
        FieldValue::Time(Some(t)) => match NaiveDate::parse_from_str(expected.trim(), "%Y-%m-%d") {
            Ok(day) => t.date_naive() == day,
            Err(_) => parse_time(expected).is_some_and(|e| e == *t),
        },
        FieldValue::Time(None) | FieldValue::Absent => false,
    }
}

/// `needle` must already be lowercase.
fn contains(value: &FieldValue<'_>, needle: &str) -> bool {
    match value {
        FieldValue::Text(s) => s.to_lowercase().contains(needle),
        FieldValue::Tags(tags) => tags.iter().any(|t| t.to_lowercase().contains(needle)),
        FieldValue::Flag(_) | FieldValue::Time(_) => value.display().to_lowercase().contains(needle),
        FieldValue::Absent => false,
    }
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Search, filters and page selection for one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub filters: Vec<Filter>,
    /// Zero-based page index
    pub page: usize,
    pub per_page: usize,
}

impl ListQuery {
    pub fn new(per_page: usize) -> Self {
        Self {
            search: None,
            filters: Vec::new(),
            page: 0,
            per_page: per_page.max(1),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() { None } else { Some(search) };
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Builds a query from URL parameters: `q`, `page` (1-based) and
    /// `flt_{field}_{op}`. Filters on fields the view does not allow, or
    /// with unparsable arguments, are rejected.
    pub fn from_params<R: Record>(
        view: &CollectionView,
        params: &[(String, String)],
        per_page: usize,
    ) -> Result<Self> {
        let mut query = ListQuery::new(per_page);
        let mut errors = ValidationErrors::default();

        for (key, raw) in params {
            match key.as_str() {
                "q" => query = query.with_search(raw.clone()),
                "page" => {
                    let page: usize = raw.trim().parse().unwrap_or(1);
                    query.page = page.saturating_sub(1);
                }
                _ => {
                    let Some(spec) = key.strip_prefix("flt_") else { continue };
                    match parse_filter::<R>(view, spec, raw) {
                        Ok(filter) => query.filters.push(filter),
                        Err(e) => errors.push(e),
                    }
                }
            }
        }

        errors.into_result()?;
        Ok(query)
    }

    /// Whether `record` passes every filter and matches the search.
    ///
    /// Search terms are split on whitespace; each term must appear in at
    /// least one searchable field.
    pub fn matches<R: Record>(&self, view: &CollectionView, record: &R) -> bool {
        if !self.filters.iter().all(|f| f.matches(record)) {
            return false;
        }
        let Some(search) = &self.search else { return true };
        search.split_whitespace().all(|term| {
            let term = term.to_lowercase();
            view.searchable
                .iter()
                .any(|field| contains(&record.value(field), &term))
        })
    }
}

fn parse_filter<R: Record>(
    view: &CollectionView,
    spec: &str,
    raw: &str,
) -> std::result::Result<Filter, FieldError> {
    // Field names contain underscores, so split on the last one.
    let (field, op) = spec
        .rsplit_once('_')
        .ok_or_else(|| FieldError::new(spec, "Malformed filter."))?;

    let field: &'static str = view
        .filterable
        .iter()
        .copied()
        .find(|f| *f == field)
        .ok_or_else(|| FieldError::new(field, "Filtering on this field is not allowed."))?;

    let kind = R::field(field).map(|s| s.kind).unwrap_or(FieldKind::Text);
    let invalid = |msg: &str| FieldError::new(field, msg);

    let op = match op {
        "eq" => FilterOp::Equals(raw.to_string()),
        "ne" => FilterOp::NotEquals(raw.to_string()),
        "contains" => FilterOp::Contains(raw.to_string()),
        "empty" => FilterOp::Empty(parse_flag(raw).ok_or_else(|| invalid("Expected yes or no."))?),
        "gt" | "lt" if kind == FieldKind::Timestamp => {
            let t = parse_time(raw).ok_or_else(|| invalid("Expected a date (YYYY-MM-DD)."))?;
            if op == "gt" {
                FilterOp::After(t)
            } else {
                FilterOp::Before(t)
            }
        }
        "gt" | "lt" => return Err(invalid("Range filters apply to timestamps only.")),
        _ => return Err(invalid("Unknown filter operation.")),
    };

    if kind == FieldKind::Flag {
        if let FilterOp::Equals(v) | FilterOp::NotEquals(v) = &op {
            if parse_flag(v).is_none() {
                return Err(invalid("Expected yes or no."));
            }
        }
    }

    Ok(Filter { field, op })
}

/// One page of a list result.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index
    pub page: usize,
    pub per_page: usize,
    /// Matches across all pages
    pub total: usize,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.per_page.max(1)).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}
