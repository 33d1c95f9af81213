//! Page arithmetic for the store listing.

/// Stores shown per listing page.
pub const STORES_PER_PAGE: u32 = 6;

/// One page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Total number of pages (at least 1).
    pub pages: u32,
    /// Total number of items.
    pub count: i64,
}

impl Pagination {
    /// Build pagination for `page` over `count` items.
    ///
    /// A page of `0` is treated as page 1.
    #[must_use]
    pub fn new(page: u32, count: i64) -> Self {
        let per_page = i64::from(STORES_PER_PAGE);
        let pages = u32::try_from((count.max(0) + per_page - 1) / per_page)
            .unwrap_or(u32::MAX)
            .max(1);
        Self {
            page: page.max(1),
            pages,
            count,
        }
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        STORES_PER_PAGE as i64
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(STORES_PER_PAGE)
    }

    /// Whether the requested page lies past the last page of a non-empty
    /// listing.
    #[must_use]
    pub const fn is_past_end(&self) -> bool {
        self.count > 0 && self.page > self.pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}
