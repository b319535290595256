//! Pagination over the request log.
//!
//! [`paginate`] is a pure read: it takes one consistent view of the
//! [`RequestLog`] and never mutates it, so two calls with the same inputs
//! and no intervening writes produce identical results.

use crate::log::RequestLog;
use crate::record::RequestRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Page number used when `page` is absent or invalid.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when `per_page` is absent or invalid.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Upper bound applied to `per_page` unless configured otherwise.
pub const DEFAULT_MAX_PER_PAGE: usize = 500;

/// Normalized pagination input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number
    pub page: usize,
    /// Records per page, always positive
    pub per_page: usize,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageQuery {
    /// Create a query, replacing zero values with the defaults.
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: if page == 0 { DEFAULT_PAGE } else { page },
            per_page: if per_page == 0 {
                DEFAULT_PER_PAGE
            } else {
                per_page
            },
        }
    }

    /// Parse `page` and `per_page` from a raw query string.
    ///
    /// Missing, non-numeric and non-positive values fall back to the
    /// defaults. The first occurrence of a parameter wins.
    pub fn from_query(query: Option<&str>) -> Self {
        Self::from_query_with_default(query, DEFAULT_PER_PAGE)
    }

    /// Like [`PageQuery::from_query`], with a custom default page size.
    pub fn from_query_with_default(query: Option<&str>, default_per_page: usize) -> Self {
        let pairs: Vec<(String, String)> = query
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        let lookup = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .and_then(|(_, value)| parse_positive(value))
        };

        Self {
            page: lookup("page").unwrap_or(DEFAULT_PAGE),
            per_page: lookup("per_page").unwrap_or(default_per_page.max(1)),
        }
    }

    /// Cap `per_page` at `max`. `None` leaves it unbounded.
    pub fn clamp_per_page(mut self, max: Option<usize>) -> Self {
        if let Some(max) = max {
            self.per_page = self.per_page.min(max.max(1));
        }
        self
    }

    /// Index of the first record on this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Accept decimal input, truncating fractions toward zero.
fn parse_positive(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Ok(n) = value.parse::<usize>() {
        return (n > 0).then_some(n);
    }
    let n = value.parse::<f64>().ok()?;
    if !n.is_finite() || n < 1.0 {
        return None;
    }
    Some(n.trunc().min(usize::MAX as f64) as usize)
}

/// One page over the request log plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Number of records in the log
    pub total: usize,
    /// Number of pages at this page size
    pub total_page: usize,
    /// Requested page
    pub current_page: usize,
    /// Page size
    pub per_page: usize,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
    /// Link to the next page, empty when there is none
    pub next_page_url: String,
    /// Link to the previous page, empty when there is none
    pub prev_page_url: String,
    /// Records on this page, newest first
    pub data: Vec<Arc<RequestRecord>>,
}

impl PageResult {
    /// Number of records on this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this page holds no records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Compute the page described by `query` over `log`.
///
/// `path` is the inspection path that navigation links point back to.
pub fn paginate(log: &RequestLog, query: PageQuery, path: &str) -> PageResult {
    let query = PageQuery::new(query.page, query.per_page);
    let (total, data) = log.slice(query.offset(), query.per_page);
    let total_page = total.div_ceil(query.per_page);

    let has_prev = query.page > 1;
    let has_next = query.page < total_page;

    PageResult {
        total,
        total_page,
        current_page: query.page,
        per_page: query.per_page,
        has_next,
        has_prev,
        next_page_url: if has_next {
            page_url(path, query.page + 1, query.per_page)
        } else {
            String::new()
        },
        prev_page_url: if has_prev {
            page_url(path, query.page - 1, query.per_page)
        } else {
            String::new()
        },
        data,
    }
}

fn page_url(path: &str, page: usize, per_page: usize) -> String {
    format!("{}?page={}&per_page={}", path, page, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn log_of(n: usize) -> RequestLog {
        let log = RequestLog::new();
        for i in 0..n {
            log.insert(RequestRecord::new("GET", format!("/{}", i)).with_status(200));
        }
        log
    }

    #[test]
    fn test_query_defaults() {
        assert_eq!(PageQuery::from_query(None), PageQuery::new(1, 20));
        assert_eq!(PageQuery::from_query(Some("")), PageQuery::new(1, 20));
        assert_eq!(
            PageQuery::from_query(Some("page=abc&per_page=-4")),
            PageQuery::new(1, 20)
        );
        assert_eq!(
            PageQuery::from_query(Some("page=0&per_page=0")),
            PageQuery::new(1, 20)
        );
    }

    #[test]
    fn test_query_parsing() {
        let query = PageQuery::from_query(Some("page=3&per_page=15&other=x"));
        assert_eq!(query.page, 3);
        assert_eq!(query.per_page, 15);

        let query = PageQuery::from_query(Some("page=2.7&per_page=10.0"));
        assert_eq!(query, PageQuery::new(2, 10));

        let query = PageQuery::from_query(Some("page=4&page=9"));
        assert_eq!(query.page, 4);
    }

    #[test]
    fn test_clamp_per_page() {
        let query = PageQuery::new(1, 10_000).clamp_per_page(Some(DEFAULT_MAX_PER_PAGE));
        assert_eq!(query.per_page, 500);

        let query = PageQuery::new(1, 10_000).clamp_per_page(None);
        assert_eq!(query.per_page, 10_000);
    }

    #[test]
    fn test_empty_log() {
        let page = paginate(&RequestLog::new(), PageQuery::default(), "/_inspector");

        assert_eq!(page.total, 0);
        assert_eq!(page.total_page, 0);
        assert_eq!(page.current_page, 1);
        assert!(page.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_prev);
        assert_eq!(page.next_page_url, "");
        assert_eq!(page.prev_page_url, "");
    }

    #[test]
    fn test_middle_page() {
        let log = log_of(45);
        let all = log.snapshot();
        let page = paginate(&log, PageQuery::new(2, 20), "/_inspector");

        assert_eq!(page.total, 45);
        assert_eq!(page.total_page, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.data, all[20..40].to_vec());
        assert!(page.has_prev);
        assert!(page.has_next);
        assert_eq!(page.prev_page_url, "/_inspector?page=1&per_page=20");
        assert_eq!(page.next_page_url, "/_inspector?page=3&per_page=20");
    }

    #[test]
    fn test_last_partial_page() {
        let log = log_of(45);
        let page = paginate(&log, PageQuery::new(3, 20), "/_inspector");

        assert_eq!(page.len(), 5);
        assert!(page.has_prev);
        assert!(!page.has_next);
        assert_eq!(page.data[4].request_url, "/0");
    }

    #[test]
    fn test_page_beyond_end() {
        let log = log_of(5);
        let page = paginate(&log, PageQuery::new(4, 20), "/_inspector");

        assert!(page.is_empty());
        assert!(!page.has_next);
        assert!(page.has_prev);
        assert_eq!(page.total_page, 1);
    }

    #[test]
    fn test_single_page() {
        let log = log_of(7);
        let page = paginate(&log, PageQuery::default(), "/_inspector");

        assert_eq!(page.len(), 7);
        assert!(!page.has_prev);
        assert!(!page.has_next);
    }

    #[test]
    fn test_read_is_idempotent() {
        let log = log_of(30);
        let first = paginate(&log, PageQuery::new(2, 7), "/_inspector");
        let second = paginate(&log, PageQuery::new(2, 7), "/_inspector");

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(log.len(), 30);
    }

    #[test]
    fn test_page_wire_fields() {
        let json = serde_json::to_value(paginate(&log_of(1), PageQuery::default(), "/x")).unwrap();
        for field in [
            "total",
            "total_page",
            "current_page",
            "per_page",
            "has_next",
            "has_prev",
            "next_page_url",
            "prev_page_url",
            "data",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_paginate_during_concurrent_inserts() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        const WRITERS: usize = 4;
        const PER_WRITER: usize = 300;

        let log = Arc::new(RequestLog::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|r| {
                let log = log.clone();
                let done = done.clone();
                thread::spawn(move || {
                    let mut last_total = 0;
                    let mut round = 0usize;
                    while !done.load(Ordering::Acquire) {
                        let query = PageQuery::new(1 + round % 5, 1 + (round + r) % 37);
                        let page = paginate(&log, query, "/_inspector");

                        assert!(page.total >= last_total);
                        last_total = page.total;
                        assert_eq!(
                            page.len(),
                            query.per_page.min(page.total.saturating_sub(query.offset()))
                        );
                        for record in &page.data {
                            assert_eq!(record.request_url, format!("/{}", record.body));
                        }
                        round += 1;
                    }
                })
            })
            .collect();

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let log = log.clone();
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        let body = format!("{}/{}", w, i);
                        log.insert(
                            RequestRecord::new("POST", format!("/{}", body)).with_body(body),
                        );
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Release);
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(log.len(), WRITERS * PER_WRITER);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_page_slices_match_log(
            len in 0usize..120,
            per_page in 1usize..40,
            page in 1usize..10,
        ) {
            let log = log_of(len);
            let all = log.snapshot();
            let result = paginate(&log, PageQuery::new(page, per_page), "/_inspector");

            prop_assert_eq!(result.total, len);
            prop_assert_eq!(result.total_page, (len + per_page - 1) / per_page);
            prop_assert!(result.len() <= per_page);

            let start = ((page - 1) * per_page).min(len);
            let end = (start + per_page).min(len);
            prop_assert_eq!(&result.data, &all[start..end].to_vec());

            prop_assert_eq!(result.has_prev, page > 1);
            prop_assert_eq!(result.has_next, page < result.total_page);
            prop_assert_eq!(result.is_empty(), page > result.total_page);
        }
    }
}
