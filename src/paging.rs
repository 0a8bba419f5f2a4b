//! Pagination of ordered result sets
//!
//! Pages are 1-based. The requested page may be a number or one of the
//! navigation tokens `>` (next), `<` (previous) and `last`, resolved relative
//! to the caller's current page. Out-of-range requests clamp to the nearest
//! valid page.

use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(usize),
    Next,
    Previous,
    Last,
}

impl PageRequest {
    /// Unparseable input falls back to the first page
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            ">" => PageRequest::Next,
            "<" => PageRequest::Previous,
            s if s.eq_ignore_ascii_case("last") => PageRequest::Last,
            s => PageRequest::Number(s.parse().unwrap_or(1)),
        }
    }

    /// Resolve against the caller's current page, clamped to `1..=total_pages`
    pub fn resolve(self, current_page: usize, total_pages: usize) -> usize {
        let wanted = match self {
            PageRequest::Number(n) => n,
            PageRequest::Next => current_page.saturating_add(1),
            PageRequest::Previous => current_page.saturating_sub(1),
            PageRequest::Last => total_pages,
        };
        wanted.clamp(1, total_pages.max(1))
    }
}

/// Paging parameters as they arrive on list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_no: Option<String>,
    pub current_page: Option<String>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        self.page_no
            .as_deref()
            .map(PageRequest::parse)
            .unwrap_or(PageRequest::Number(1))
    }

    pub fn current(&self) -> usize {
        self.current_page
            .as_deref()
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub all_page_nos: Vec<usize>,
    pub total_pages: usize,
    pub current_page: usize,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        paginate(Vec::new(), PageRequest::Number(1), 1)
    }
}

pub fn total_pages(total_items: usize) -> usize {
    total_items.div_ceil(PAGE_SIZE)
}

pub fn paginate<T>(items: Vec<T>, requested: PageRequest, current_page: usize) -> Page<T> {
    let total_pages = total_pages(items.len());
    let page = requested.resolve(current_page, total_pages);
    let start = (page - 1) * PAGE_SIZE;

    Page {
        items: items.into_iter().skip(start).take(PAGE_SIZE).collect(),
        all_page_nos: (1..=total_pages).collect(),
        total_pages,
        current_page: page,
    }
}
