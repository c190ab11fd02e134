//! Status filtering and pagination of the schedule view.
//!
//! Everything here is a pure derivation from the loaded list and the
//! current `ViewState`; nothing is cached between calls.

use crate::models::{Appointment, StatusFilter};

pub const PAGE_SIZE: usize = 10;

/// Pages beyond this count switch the page control to a windowed layout.
const FULL_WINDOW_LIMIT: usize = 7;

/// Filter and page selection. Ephemeral, owned by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    filter: StatusFilter,
    page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            filter: StatusFilter::default(),
            page: 1,
        }
    }
}

impl ViewState {
    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Select a filter. Always returns to page 1, even when `filter` is
    /// already selected.
    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.page = 1;
    }

    /// Jump to a page. Not clamped against the page count; page 0 is
    /// treated as page 1.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    /// Move forward one page. Returns false when already on the last page.
    pub fn next_page(&mut self, total_pages: usize) -> bool {
        if self.page >= total_pages {
            return false;
        }
        self.page += 1;
        true
    }

    /// Move back one page. Returns false when already on page 1.
    pub fn previous_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        true
    }
}

/// One entry of the page-number control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageToken {
    Page(usize),
    Ellipsis,
}

/// The slice of the schedule currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    pub items: Vec<&'a Appointment>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based inclusive positions of `items` within the filtered list.
    pub range: Option<(usize, usize)>,
}

impl PageView<'_> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn filter_appointments(all: &[Appointment], filter: StatusFilter) -> Vec<&Appointment> {
    all.iter().filter(|a| filter.matches(&a.status)).collect()
}

pub fn total_pages(item_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    item_count.div_ceil(page_size)
}

/// Filter `all` by the view's filter and cut out the view's page.
pub fn paginate<'a>(all: &'a [Appointment], view: &ViewState, page_size: usize) -> PageView<'a> {
    let filtered = filter_appointments(all, view.filter);
    let total_items = filtered.len();
    let total_pages = total_pages(total_items, page_size);

    let start = (view.page - 1).saturating_mul(page_size);
    let items: Vec<&Appointment> = filtered
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    let range = if items.is_empty() {
        None
    } else {
        Some((start + 1, start + items.len()))
    };

    PageView {
        items,
        page: view.page,
        total_pages,
        total_items,
        range,
    }
}

/// Page numbers to show in the page control.
///
/// Up to seven pages are listed in full. Beyond that the first and last
/// pages are always shown, with the neighbourhood of the current page.
pub fn page_window(page: usize, total_pages: usize) -> Vec<PageToken> {
    if total_pages <= FULL_WINDOW_LIMIT {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    let mut tokens = Vec::with_capacity(FULL_WINDOW_LIMIT);
    if page <= 4 {
        tokens.extend((1..=5).map(PageToken::Page));
        tokens.push(PageToken::Ellipsis);
        tokens.push(PageToken::Page(total_pages));
    } else if page >= total_pages - 3 {
        tokens.push(PageToken::Page(1));
        tokens.push(PageToken::Ellipsis);
        tokens.extend((total_pages - 4..=total_pages).map(PageToken::Page));
    } else {
        tokens.push(PageToken::Page(1));
        tokens.push(PageToken::Ellipsis);
        tokens.extend((page - 1..=page + 1).map(PageToken::Page));
        tokens.push(PageToken::Ellipsis);
        tokens.push(PageToken::Page(total_pages));
    }
    tokens
}

/// Number of appointments under each filter tab.
pub fn count_by_filter(all: &[Appointment]) -> Vec<(StatusFilter, usize)> {
    StatusFilter::TABS
        .iter()
        .map(|&f| (f, all.iter().filter(|a| f.matches(&a.status)).count()))
        .collect()
}
