//! Sort and pagination specifications
//!
//! These are constructed fresh per request from validated input and
//! discarded when the request completes.

use serde::Serialize;

/// A single-field sort specification
///
/// A leading `-` marks descending order and is stripped to obtain the field
/// name; only one sort field is supported per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    /// Parse a raw sort value (`field` or `-field`)
    pub fn parse(raw: &str) -> Self {
        Self {
            field: raw.replacen('-', "", 1),
            descending: raw.starts_with('-'),
        }
    }

    pub fn direction(&self) -> &'static str {
        if self.descending { "desc" } else { "asc" }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: "id".to_string(),
            descending: false,
        }
    }
}

/// A pagination request: `page ≥ 1`, `pageSize ≥ 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub page_size: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl Page {
    /// Zero-based offset of the first row on this page
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }
}

/// Pagination metadata returned alongside an index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub row_count: u64,
    pub page_count: u64,
}

impl Pagination {
    /// `pageCount` is `ceil(rowCount / pageSize)`, and explicitly 0 for an
    /// empty result set.
    pub fn new(page: Page, row_count: u64) -> Self {
        let page_count = if row_count == 0 {
            0
        } else {
            row_count.div_ceil(page.page_size)
        };
        Self {
            page: page.page,
            page_size: page.page_size,
            row_count,
            page_count,
        }
    }
}
