//! Filter and pagination engine
//!
//! Pure computation: turns the page/size/sort parameters of a list request
//! into a validated [`QueryPlan`] that adapters translate into their native
//! skip/limit/order clauses, and turns a matching-record count back into page
//! [`Metadata`].

use serde::Serialize;

use crate::errors::Result;
use crate::rules::validation::{permitted_value, Validator};

pub const MAX_PAGE: i64 = 10_000_000;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Native sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Page, page size and sort requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
    pub sort_safelist: Vec<String>,
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>, safelist: &[&str]) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
            sort_safelist: safelist.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Column named by `sort`, without the direction prefix
    pub fn sort_column(&self) -> &str {
        self.sort.strip_prefix('-').unwrap_or(&self.sort)
    }

    pub fn sort_direction(&self) -> SortDirection {
        if self.sort.starts_with('-') {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    /// Validate and build the plan adapters execute
    ///
    /// # Errors
    /// Returns `LibrisError::Validation` with one entry per invalid parameter.
    pub fn plan(&self) -> Result<QueryPlan> {
        let mut v = Validator::new();
        validate_filters(&mut v, self);
        v.finish()?;

        // Both bounds were checked above
        let page = self.page as u64;
        let page_size = self.page_size as u64;
        Ok(QueryPlan {
            page,
            page_size,
            offset: (page - 1) * page_size,
            limit: page_size,
            sort_column: self.sort_column().to_string(),
            direction: self.sort_direction(),
        })
    }
}

/// Record every invalid paging or sort parameter in `v`
pub fn validate_filters(v: &mut Validator, f: &Filters) {
    v.check(f.page > 0, "page", "must be greater than zero");
    v.check(f.page <= MAX_PAGE, "page", "must be a maximum of 10 million");
    v.check(f.page_size > 0, "page_size", "must be greater than zero");
    v.check(
        f.page_size <= MAX_PAGE_SIZE,
        "page_size",
        "must be a maximum of 100",
    );
    v.check(
        permitted_value(&f.sort, &f.sort_safelist),
        "sort",
        "invalid sort value",
    );
}

/// Validated skip/limit/order parameters
///
/// Only obtainable through [`Filters::plan`], so an adapter never sees an
/// unlisted sort column or an out-of-range page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    page: u64,
    page_size: u64,
    offset: u64,
    limit: u64,
    sort_column: String,
    direction: SortDirection,
}

impl QueryPlan {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Records to skip
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Records to take
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn sort_column(&self) -> &str {
        &self.sort_column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Page metadata for `total_records` matching records
    pub fn metadata(&self, total_records: u64) -> Metadata {
        Metadata::calculate(total_records, self.page, self.page_size)
    }
}

/// Case-insensitive substring filter on one string field
///
/// An empty value matches every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    pub field: String,
    pub value: String,
}

impl TextFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.value.is_empty()
    }
}

/// Everything an adapter needs to answer a list request
///
/// Text filters and the tag filter combine with logical AND. A record passes
/// the tag filter when its tag set is a superset of `tags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub text: Vec<TextFilter>,
    pub tags: Vec<String>,
    pub plan: QueryPlan,
}

impl ListQuery {
    pub fn new(plan: QueryPlan) -> Self {
        Self {
            text: Vec::new(),
            tags: Vec::new(),
            plan,
        }
    }

    pub fn with_text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.push(TextFilter::new(field, value));
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Text filters that actually constrain the result
    pub fn active_text(&self) -> impl Iterator<Item = &TextFilter> {
        self.text.iter().filter(|f| !f.is_match_all())
    }
}

/// Page bounds returned alongside a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Metadata {
    /// Metadata for `total_records` matches; all zero when nothing matched
    pub fn calculate(total_records: u64, page: u64, page_size: u64) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.last_page
    }
}
