use std::ops::Range;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_index: usize,
    page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self, nrows: usize) -> usize {
        nrows.div_ceil(self.page_size).max(1)
    }

    pub fn can_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_next(&self, nrows: usize) -> bool {
        self.page_index + 1 < self.page_count(nrows)
    }

    pub fn previous_page(&mut self) -> bool {
        if self.can_previous() {
            self.page_index -= 1;
            true
        } else {
            false
        }
    }

    pub fn next_page(&mut self, nrows: usize) -> bool {
        if self.can_next(nrows) {
            self.page_index += 1;
            true
        } else {
            false
        }
    }

    pub fn first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn last_page(&mut self, nrows: usize) {
        self.page_index = self.page_count(nrows) - 1;
    }

    /// Keep the page index valid after the number of rows changed.
    pub fn clamp(&mut self, nrows: usize) {
        self.page_index = self.page_index.min(self.page_count(nrows) - 1);
    }

    /// Rows of the current page as a range into the row list.
    pub fn page_range(&self, nrows: usize) -> Range<usize> {
        let start = (self.page_index * self.page_size).min(nrows);
        let end = (start + self.page_size).min(nrows);
        start..end
    }
}
