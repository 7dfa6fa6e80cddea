//! Sample navigation over the paginated line items table.
//!
//! A sample is requested by its 1-based `line_index`. If the row is on the
//! loaded page the caller scrolls to it; otherwise the navigator switches to
//! the page that holds it and, once that page arrives, hands back its first
//! row for auto-selection.

use tracing::debug;

use crate::defaults::LINE_ITEMS_PAGE_LIMIT;
use crate::models::{LineItem, LineItemStatus, LineItemsPage};

/// Page holding `line_index` for a given page size: `ceil(line_index / limit)`.
///
/// Both arguments are clamped to at least 1.
///
/// ```
/// use labelwise_core::navigator::target_page;
///
/// assert_eq!(target_page(1, 10), 1);
/// assert_eq!(target_page(10, 10), 1);
/// assert_eq!(target_page(11, 10), 2);
/// ```
pub fn target_page(line_index: u32, limit: u32) -> u32 {
    let line_index = line_index.max(1);
    let limit = limit.max(1);
    line_index.div_ceil(limit)
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Row is on the loaded page; bring it into view.
    ScrollTo(u32),
    /// Page changed; fetch it and wait for [`SampleNavigator::on_page_loaded`].
    ChangePage(u32),
    /// Nothing to do.
    Ignored(IgnoreReason),
}

/// Why a navigation request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoSelection,
    PageNotLoaded,
    InFlight,
    AlreadyRequested,
    /// Row would be on the current page but is filtered out of it.
    NotOnPage,
    /// Target page is beyond the last known page.
    BeyondLastPage,
}

/// Page state of the line items table plus the navigation latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleNavigator {
    page: u32,
    limit: u32,
    status_filter: Option<LineItemStatus>,
    last_requested: Option<u32>,
    navigating: bool,
    auto_page_change: bool,
}

impl Default for SampleNavigator {
    fn default() -> Self {
        Self::new(LINE_ITEMS_PAGE_LIMIT)
    }
}

impl SampleNavigator {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            status_filter: None,
            last_requested: None,
            navigating: false,
            auto_page_change: false,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn status_filter(&self) -> Option<LineItemStatus> {
        self.status_filter
    }

    /// True while a scroll or page change is in progress.
    pub fn is_navigating(&self) -> bool {
        self.navigating
    }

    /// True after an automatic page change until the new page is delivered.
    pub fn is_auto_page_change(&self) -> bool {
        self.auto_page_change
    }

    /// Handle a request to show sample `selected` given the loaded page.
    pub fn request(&mut self, selected: Option<u32>, loaded: Option<&LineItemsPage>) -> Navigation {
        let Some(index) = selected.filter(|i| *i > 0) else {
            return Navigation::Ignored(IgnoreReason::NoSelection);
        };
        let Some(loaded) = loaded else {
            return Navigation::Ignored(IgnoreReason::PageNotLoaded);
        };
        if self.navigating {
            return Navigation::Ignored(IgnoreReason::InFlight);
        }
        if self.last_requested == Some(index) {
            return Navigation::Ignored(IgnoreReason::AlreadyRequested);
        }
        self.last_requested = Some(index);

        if loaded.find(index).is_some() {
            self.navigating = true;
            debug!(line_index = index, page = self.page, "Sample on current page");
            return Navigation::ScrollTo(index);
        }

        let target = target_page(index, self.limit);
        if target == self.page {
            return Navigation::Ignored(IgnoreReason::NotOnPage);
        }
        if target > loaded.num_pages {
            debug!(
                line_index = index,
                target_page = target,
                num_pages = loaded.num_pages,
                "Navigation beyond last page dropped"
            );
            return Navigation::Ignored(IgnoreReason::BeyondLastPage);
        }

        debug!(line_index = index, from = self.page, to = target, "Changing page for sample");
        self.page = target;
        self.auto_page_change = true;
        Navigation::ChangePage(target)
    }

    /// The scroll started by [`Navigation::ScrollTo`] has finished.
    pub fn finish_scroll(&mut self) {
        self.navigating = false;
    }

    /// New page data arrived. Returns the row to auto-select after an
    /// automatic page change.
    pub fn on_page_loaded<'a>(&mut self, loaded: &'a LineItemsPage) -> Option<&'a LineItem> {
        self.navigating = false;
        if self.auto_page_change {
            if let Some(first) = loaded.data.first() {
                self.auto_page_change = false;
                return Some(first);
            }
        }
        None
    }

    /// Step back one page. Returns false at the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one page. Returns false at the last page.
    pub fn next_page(&mut self, num_pages: u32) -> bool {
        if self.page < num_pages {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Change the status filter; always returns to the first page.
    pub fn set_status_filter(&mut self, filter: Option<LineItemStatus>) {
        self.status_filter = filter;
        self.page = 1;
    }
}

/// Previous/next stepping through samples by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePager {
    current: u32,
    num_samples: u32,
}

impl SamplePager {
    pub fn new(initial: Option<u32>, num_samples: u32) -> Self {
        Self {
            current: initial.filter(|i| *i > 0).unwrap_or(1),
            num_samples,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    /// Fetching the current sample makes sense only within bounds.
    pub fn is_fetchable(&self) -> bool {
        self.current >= 1 && self.current <= self.num_samples
    }

    pub fn previous(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        if self.current < self.num_samples {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Jump to `index` when it differs from the current sample.
    pub fn jump_to(&mut self, index: u32) -> bool {
        if index > 0 && index != self.current {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn set_num_samples(&mut self, num_samples: u32) {
        self.num_samples = num_samples;
    }
}
