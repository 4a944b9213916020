//! Page arithmetic over an offset/limit listing.

/// Pagination state for an offset-based listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    offset: usize,
    items_per_page: usize,
    total_items: usize,
}

impl Pagination {
    /// Creates pagination at offset zero.
    #[must_use]
    pub const fn new(items_per_page: usize, total_items: usize) -> Self {
        Self {
            offset: 0,
            items_per_page,
            total_items,
        }
    }

    /// Current offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Items per page.
    #[must_use]
    pub const fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Total number of items.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.total_items
    }

    /// Moves to an offset.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Changes the page size and returns to the first page.
    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.items_per_page = items_per_page;
        self.offset = 0;
    }

    /// Updates the total, e.g. after a new search.
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
    }

    const fn is_degenerate(&self) -> bool {
        self.items_per_page == 0 || self.total_items == 0
    }

    /// Last page number; 1 when there is nothing to page.
    #[must_use]
    pub const fn last_page(&self) -> usize {
        if self.is_degenerate() {
            return 1;
        }
        self.total_items.div_ceil(self.items_per_page)
    }

    /// Page number for the current offset. An offset inside a page counts
    /// as the following page.
    #[must_use]
    pub const fn current_page(&self) -> usize {
        if self.is_degenerate() {
            return 1;
        }
        (self.offset + self.items_per_page).div_ceil(self.items_per_page)
    }

    /// Page before the current one, never below 1.
    #[must_use]
    pub const fn previous_page(&self) -> usize {
        let current = self.current_page();
        if current <= 1 { 1 } else { current - 1 }
    }

    /// Page after the current one, never past the last.
    #[must_use]
    pub const fn next_page(&self) -> usize {
        let current = self.current_page();
        if current >= self.last_page() {
            self.last_page()
        } else {
            current + 1
        }
    }

    /// Offset at which `page` starts.
    #[must_use]
    pub const fn page_offset(&self, page: usize) -> usize {
        self.items_per_page.saturating_mul(page.saturating_sub(1))
    }

    /// Moves to the start of `page`.
    pub fn go_to_page(&mut self, page: usize) {
        self.offset = self.page_offset(page);
    }
}
