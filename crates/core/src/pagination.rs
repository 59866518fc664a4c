//! Page request coercion and pagination metadata.

use crate::config::CoreConfig;
use crate::predicate::PageWindow;
use serde::{Deserialize, Serialize};

/// A validated page request: both numbers are at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// A request for `page` of `page_size` items. Zero is raised to 1 for both.
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Coerce raw query values into a usable request.
    ///
    /// A missing, non-numeric or non-positive `page` becomes 1. A missing, non-numeric or
    /// non-positive `page_size` becomes the configured default; larger values are capped at the
    /// configured maximum.
    pub fn coerce(page: Option<&str>, page_size: Option<&str>, cfg: &CoreConfig) -> Self {
        Self::from_numbers(parse_positive(page), parse_positive(page_size), cfg)
    }

    /// Same as [`PageRequest::coerce`] for callers that already hold numbers.
    pub fn from_numbers(page: Option<i64>, page_size: Option<i64>, cfg: &CoreConfig) -> Self {
        let page = page.filter(|p| *p > 0).map_or(1, |p| p as usize);
        let page_size = page_size
            .filter(|s| *s > 0)
            .map_or(cfg.default_page_size(), |s| s as usize)
            .min(cfg.max_page_size());
        Self::new(page, page_size)
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            skip: (self.page - 1).saturating_mul(self.page_size),
            take: self.page_size,
        }
    }
}

fn parse_positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// Pagination metadata returned alongside every listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(request.page_size);
        Self {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.page_size,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }

    /// Metadata for a result set that was never queried.
    pub fn empty(request: PageRequest) -> Self {
        Self {
            current_page: request.page,
            total_pages: 0,
            total_items: 0,
            items_per_page: request.page_size,
            has_next_page: false,
            has_prev_page: false,
        }
    }
}

/// Slice an already-ordered list according to `request`.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(request, items.len());
    let window = request.window();
    let page = items.into_iter().skip(window.skip).take(window.take).collect();
    (page, pagination)
}
