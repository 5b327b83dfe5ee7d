//! Page range planning

use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive, 1-based page range of one harvest
///
/// Always satisfies `start >= 1`, `end >= start` and
/// `total == end - start + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    start: u32,
    end: u32,
    total: u32,
}

impl PageRange {
    fn from_bounds(start: u32, end: u32) -> Self {
        let start = start.max(1);
        let end = end.max(start);
        Self {
            start,
            end,
            total: end - start + 1,
        }
    }

    /// A range holding only `page`
    pub fn single(page: u32) -> Self {
        Self::from_bounds(page, page)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Pages in ascending order
    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// 1-based position of `page` within the range
    pub fn position(&self, page: u32) -> u32 {
        page.saturating_sub(self.start) + 1
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Turns pagination parameters into a concrete page range
///
/// `page_count` is a window size, not an absolute bound:
///
/// | Given        | start                         | end                     |
/// |--------------|-------------------------------|-------------------------|
/// | from and to  | `max(1, from)`                | `max(start, to)`        |
/// | from only    | `max(1, from)`                | `start + page_count - 1`|
/// | to only      | `max(1, end - page_count + 1)`| `max(1, to)`            |
/// | neither      | `1`                           | `page_count`            |
///
/// A `page_count` of zero is treated as one.
///
/// # Arguments
///
/// * `page_count` - Window size used when at most one bound is given
/// * `from_page` - Optional first page (1-based)
/// * `to_page` - Optional last page (1-based, inclusive)
///
/// # Returns
///
/// A `PageRange` with `start >= 1` and `total == end - start + 1`
pub fn plan(page_count: u32, from_page: Option<u32>, to_page: Option<u32>) -> PageRange {
    let window = page_count.max(1);

    match (from_page, to_page) {
        (Some(from), Some(to)) => PageRange::from_bounds(from, to.max(from.max(1))),
        (Some(from), None) => {
            let start = from.max(1);
            PageRange::from_bounds(start, start.saturating_add(window - 1))
        }
        (None, Some(to)) => {
            let end = to.max(1);
            PageRange::from_bounds(end.saturating_sub(window - 1), end)
        }
        (None, None) => PageRange::from_bounds(1, window),
    }
}
