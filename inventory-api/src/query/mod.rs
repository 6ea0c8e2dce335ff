//! List query support: pagination, ordering and substring search.
//!
//! Each listable entity has a filter struct in a submodule. A filter is decoded
//! from the query string by Rocket (`?<filter..>`) and translated into a Diesel
//! boxed query. Named predicates have a SQL translator here and an in-memory
//! twin in [`crate::policy`]; the tests in each submodule check they agree.

use chrono::NaiveDate;
use rocket::form::{self, FromFormField, ValueField};
use serde::Serialize;

use crate::error::InventoryError;

pub mod device;
pub mod maintenance;
pub mod reference;
pub mod software;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const TABLE_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page-number pagination with an upper bound on page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Missing or non-positive sizes fall back to `default_size`; anything over
    /// [`MAX_PAGE_SIZE`] is clamped.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page_size = match page_size {
            Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
            _ => default_size.clamp(1, MAX_PAGE_SIZE),
        };
        PageRequest { page: page.unwrap_or(1), page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn page_count(&self, total: i64) -> i64 {
        if total <= 0 { 1 } else { (total + self.page_size - 1) / self.page_size }
    }

    /// Page 1 always exists; any other page must fall inside the result set.
    pub fn check(&self, total: i64) -> Result<(), InventoryError> {
        if self.page < 1 || self.page > self.page_count(total) {
            return Err(InventoryError::NotFound("Invalid page.".to_string()));
        }
        Ok(())
    }

    pub fn has_next(&self, total: i64) -> bool {
        self.page < self.page_count(total)
    }

    /// Applies this page to an in-memory result set.
    pub fn slice<T>(&self, rows: Vec<T>) -> Result<Vec<T>, InventoryError> {
        self.check(rows.len() as i64)?;
        Ok(rows.into_iter().skip(self.offset() as usize).take(self.page_size as usize).collect())
    }
}

/// Paginated response envelope.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64) -> Self {
        Page { count, next: None, previous: None, results }
    }

    /// Fills `next`/`previous` by rewriting the `page` parameter of the
    /// request URL.
    pub fn with_links(mut self, path: &str, query: Option<&str>, request: &PageRequest) -> Self {
        if request.has_next(self.count) {
            self.next = Some(page_url(path, query, request.page + 1));
        }
        if request.page > 1 {
            self.previous = Some(page_url(path, query, request.page - 1));
        }
        self
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

fn page_url(path: &str, query: Option<&str>, page: i64) -> String {
    let mut params: Vec<String> = query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .map(str::to_string)
        .collect();
    // Page one is the default and carries no parameter.
    if page > 1 {
        params.push(format!("page={}", page));
    }
    if params.is_empty() { path.to_string() } else { format!("{}?{}", path, params.join("&")) }
}

/// One `ordering` key resolved against a whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub field: &'static str,
    pub descending: bool,
}

/// Parses `ordering=-a,b`. Unknown fields are ignored; when nothing valid is
/// left, `default` applies.
pub fn parse_ordering(
    raw: Option<&str>,
    whitelist: &[&'static str],
    default: &[OrderKey],
) -> Vec<OrderKey> {
    let keys: Vec<OrderKey> = raw
        .unwrap_or("")
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let (descending, name) = match item.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, item),
            };
            whitelist.iter().find(|f| **f == name).map(|field| OrderKey { field, descending })
        })
        .collect();

    if keys.is_empty() { default.to_vec() } else { keys }
}

/// Escapes LIKE metacharacters; patterns are used with `ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `%term%` pattern for a case-insensitive substring match. SQLite's LIKE
/// folds ASCII case.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// The trimmed search term, or `None` when it is blank.
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// A `YYYY-MM-DD` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormDate(pub NaiveDate);

impl<'v> FromFormField<'v> for FormDate {
    fn from_value(field: ValueField<'v>) -> form::Result<'v, Self> {
        NaiveDate::parse_from_str(field.value, "%Y-%m-%d")
            .map(FormDate)
            .map_err(|_| form::Error::validation("Enter a valid date.").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_capped() {
        assert_eq!(PageRequest::new(None, Some(500), 20).page_size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(None, None, 20).page_size, 20);
        assert_eq!(PageRequest::new(None, Some(0), 25).page_size, 25);
        assert_eq!(PageRequest::new(Some(3), Some(10), 20).offset(), 20);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        let req = PageRequest::new(Some(3), Some(10), 20);
        assert!(req.check(25).is_ok());
        assert!(matches!(req.check(20), Err(InventoryError::NotFound(_))));
        assert!(PageRequest::new(Some(1), None, 20).check(0).is_ok());
        assert!(PageRequest::new(Some(0), None, 20).check(10).is_err());
    }

    #[test]
    fn links_rewrite_the_page_parameter() {
        let req = PageRequest::new(Some(2), Some(10), 20);
        let page = Page::new(vec![1, 2, 3], 35).with_links(
            "/api/devices",
            Some("status=active&page=2&page_size=10"),
            &req,
        );
        assert_eq!(page.next.as_deref(), Some("/api/devices?status=active&page_size=10&page=3"));
        assert_eq!(page.previous.as_deref(), Some("/api/devices?status=active&page_size=10"));

        let last = Page::new(vec![1], 11).with_links("/api/software", None, &req);
        assert!(last.next.is_none());
    }

    #[test]
    fn ordering_ignores_unknown_fields() {
        let default = [OrderKey { field: "asset_tag", descending: false }];
        let fields = ["asset_tag", "model", "created_at"];
        let keys = parse_ordering(Some("-model,bogus,created_at"), &fields, &default);
        assert_eq!(
            keys,
            vec![
                OrderKey { field: "model", descending: true },
                OrderKey { field: "created_at", descending: false }
            ]
        );
        assert_eq!(parse_ordering(Some("bogus"), &["model"], &default), default.to_vec());
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(search_term(Some("   ")), None);
        assert_eq!(search_term(Some(" dell ")), Some("dell".to_string()));
    }
}
