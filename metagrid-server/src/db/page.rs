//! Page-number pagination shared by list endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Upper bound on items per page
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Query parameters accepted by list endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number (1-indexed)
    #[param(default = 1, minimum = 1)]
    pub page: Option<i64>,

    /// Items per page (max 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

/// Validated pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    /// Resolve query parameters against the configured default page size.
    ///
    /// Pages start at 1. The limit must be positive and is capped at
    /// [`MAX_PAGE_LIMIT`].
    pub fn from_query(query: &PageQuery, default_limit: i64) -> Result<Self, String> {
        let page = query.page.unwrap_or(1);
        if page < 1 {
            return Err(format!("page must be at least 1, got {}", page));
        }

        let limit = query.limit.unwrap_or(default_limit);
        if limit < 1 {
            return Err(format!("limit must be at least 1, got {}", limit));
        }

        let limit = limit.min(MAX_PAGE_LIMIT);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(format!("page {} is out of range", page));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, params: &PageParams, total: i64) -> Self {
        let has_more = params.offset().saturating_add(results.len() as i64) < total;
        Self {
            results,
            page: params.page,
            limit: params.limit,
            total,
            has_more,
        }
    }

    /// Slice an already-ordered collection (memory backend).
    pub fn from_ordered(items: Vec<T>, params: &PageParams) -> Self {
        let total = items.len() as i64;
        let results: Vec<T> = items
            .into_iter()
            .skip(usize::try_from(params.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(params.limit).unwrap_or(0))
            .collect();
        Self::new(results, params, total)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_defaults() {
        let params = PageParams::from_query(&PageQuery::default(), 10).unwrap();
        assert_eq!(params, PageParams { page: 1, limit: 10 });
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_from_query_caps_limit() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(500),
        };
        let params = PageParams::from_query(&query, 10).unwrap();
        assert_eq!(params.limit, MAX_PAGE_LIMIT);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn test_from_query_rejects_non_positive() {
        let zero_page = PageQuery {
            page: Some(0),
            limit: None,
        };
        assert!(PageParams::from_query(&zero_page, 10).is_err());

        let zero_limit = PageQuery {
            page: None,
            limit: Some(0),
        };
        assert!(PageParams::from_query(&zero_limit, 10).is_err());
    }

    #[test]
    fn test_from_query_rejects_overflowing_page() {
        let huge = PageQuery {
            page: Some(i64::MAX),
            limit: None,
        };
        assert!(PageParams::from_query(&huge, 10).is_err());

        // Largest page whose offset still fits
        let edge = PageQuery {
            page: Some(i64::MAX / 10 + 1),
            limit: Some(10),
        };
        let params = PageParams::from_query(&edge, 10).unwrap();
        assert!(params.offset() > 0);
        let page = Page::from_ordered(vec![1, 2, 3], &params);
        assert!(page.results.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn test_from_ordered_slices_and_reports_more() {
        let params = PageParams { page: 2, limit: 2 };
        let page = Page::from_ordered(vec![1, 2, 3, 4, 5], &params);
        assert_eq!(page.results, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert!(page.has_more);

        let last = Page::from_ordered(vec![1, 2, 3, 4, 5], &PageParams { page: 3, limit: 2 });
        assert_eq!(last.results, vec![5]);
        assert!(!last.has_more);
    }

    #[test]
    fn test_map_keeps_counts() {
        let page = Page::new(vec![1, 2], &PageParams { page: 1, limit: 2 }, 3).map(|n| n * 10);
        assert_eq!(page.results, vec![10, 20]);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
    }
}
