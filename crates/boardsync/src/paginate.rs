//! Cursor-based pagination.

use std::future::Future;

use serde::Deserialize;
use tracing::{trace, warn};

use crate::error::Error;

/// Largest page the server hands out.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One page of a connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub nodes: Vec<T>,
    pub page_info: PageInfo,
}

/// Page size to request for a list bounded by `limit` (0 means unbounded).
///
/// Filtered traversals ask for full pages since an unknown share of each
/// page will be discarded.
pub fn page_size(limit: usize, filtered: bool) -> usize {
    if limit == 0 || filtered {
        MAX_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

/// Walks a connection page by page and collects the selected items.
///
/// `fetch` receives `None` for the first page and the previous page's end
/// cursor afterwards. `select` turns each node into an item or drops it;
/// dropped nodes do not count toward `limit`. Once `limit` items (0 means
/// unbounded) are collected no further page is requested.
///
/// # Errors
///
/// The first error returned by `fetch` aborts the walk; no partial result is
/// returned.
pub async fn paginate<R, T, F, Fut, S>(limit: usize, mut fetch: F, mut select: S) -> Result<Vec<T>, Error>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<R>, Error>>,
    S: FnMut(R) -> Option<T>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;
        trace!(page = pages, nodes = page.nodes.len(), "Fetched page");

        for node in page.nodes {
            if let Some(item) = select(node) {
                items.push(item);
                if limit > 0 && items.len() >= limit {
                    return Ok(items);
                }
            }
        }

        if !page.page_info.has_next_page {
            return Ok(items);
        }
        match page.page_info.end_cursor {
            Some(next) => cursor = Some(next),
            None => {
                warn!(page = pages, "Page reported more results without a cursor; stopping");
                return Ok(items);
            }
        }
    }
}
