//! Page math for the public report list.
//!
//! Pages are 1-based. The link window shows at most [`MAX_VISIBLE_PAGES`]
//! numbered links around the current page, plus first/last links separated
//! by ellipses when the window does not reach them.

use serde::Serialize;

/// Default number of reports per list page.
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Default number of reports on the top page.
pub const DEFAULT_TOP_PAGE_COUNT: u32 = 3;

/// Maximum numbered links in the page window.
pub const MAX_VISIBLE_PAGES: u32 = 5;

/// Offset/limit pair for a 1-based page. Page 0 is treated as page 1.
pub fn page_bounds(page: u32, page_size: u32) -> (u64, u64) {
    let page = page.max(1) as u64;
    let size = page_size as u64;
    ((page - 1) * size, size)
}

/// Number of pages needed for `total` items (0 when there are none).
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64) as u32
}

/// One element of the rendered pagination bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    Prev { page: Option<u32> },
    Number { page: u32, current: bool },
    Ellipsis,
    Next { page: Option<u32> },
}

/// Build the pagination bar. Empty when there is at most one page.
pub fn page_links(current: u32, total_pages: u32) -> Vec<PageLink> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);

    let mut start = current.saturating_sub(MAX_VISIBLE_PAGES / 2).max(1);
    let end = (start + MAX_VISIBLE_PAGES - 1).min(total_pages);
    if end - start + 1 < MAX_VISIBLE_PAGES {
        start = (end + 1).saturating_sub(MAX_VISIBLE_PAGES).max(1);
    }

    let mut links = vec![PageLink::Prev {
        page: (current > 1).then(|| current - 1),
    }];

    if start > 1 {
        links.push(PageLink::Number {
            page: 1,
            current: false,
        });
        if start > 2 {
            links.push(PageLink::Ellipsis);
        }
    }

    links.extend((start..=end).map(|page| PageLink::Number {
        page,
        current: page == current,
    }));

    if end < total_pages {
        if end < total_pages - 1 {
            links.push(PageLink::Ellipsis);
        }
        links.push(PageLink::Number {
            page: total_pages,
            current: false,
        });
    }

    links.push(PageLink::Next {
        page: (current < total_pages).then(|| current + 1),
    });
    links
}
