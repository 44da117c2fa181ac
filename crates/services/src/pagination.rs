//! # Cursor Paginator
//!
//! Turns raw query parameters into a page window and answers the three
//! follow-up questions every listing response needs: where the next page
//! starts, where the previous one starts, and how much is left.

use std::sync::Arc;

use domains::{CursorIndex, ListingScope, PageParams, PageWindow, Result, DEFAULT_PAGE_LIMIT};

/// Derives `{cursor, limit}` from query parameters.
///
/// Malformed values never reject the request: a bad `limit` falls back to
/// the default and a bad cursor means "from the start".
pub fn derive_window(params: &PageParams) -> PageWindow {
    let limit = params
        .limit
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|limit| *limit >= 1)
        .unwrap_or(DEFAULT_PAGE_LIMIT);

    let cursor = params
        .from
        .as_deref()
        .or(params.last_id.as_deref())
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|cursor| *cursor >= 0);

    PageWindow { cursor, limit }
}

/// Cursor metadata for one delivered page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursors {
    pub next: Option<i64>,
    pub previous: Option<i64>,
    /// Matching rows past the page, capped at the window limit.
    pub remaining: u64,
}

#[derive(Clone)]
pub struct CursorPaginator {
    index: Arc<dyn CursorIndex>,
}

impl CursorPaginator {
    pub fn new(index: Arc<dyn CursorIndex>) -> Self {
        Self { index }
    }

    /// Id of the first matching record past the page, or `None` when the
    /// page is the last one.
    pub async fn next_cursor(&self, scope: &ListingScope, page_ids: &[i64]) -> Result<Option<i64>> {
        let Some(max) = page_ids.iter().copied().max() else {
            return Ok(None);
        };
        Ok(self.index.first_id_after(scope, max).await?)
    }

    /// The `from` value that rebuilds the page immediately before this one,
    /// or `None` when this page is the first.
    ///
    /// An empty page (cursor past the end) is anchored at its cursor.
    pub async fn previous_cursor(
        &self,
        scope: &ListingScope,
        window: &PageWindow,
        page_ids: &[i64],
    ) -> Result<Option<i64>> {
        let Some(boundary) = page_ids.iter().copied().min().or(window.cursor) else {
            return Ok(None);
        };
        let ids = self.index.ids_before(scope, boundary, window.limit).await?;
        Ok(ids.into_iter().min())
    }

    /// Records past the page, never reporting more than `limit`.
    pub async fn remaining_count(&self, scope: &ListingScope, page_ids: &[i64], limit: u32) -> Result<u64> {
        let Some(max) = page_ids.iter().copied().max() else {
            return Ok(0);
        };
        let count = self.index.count_after(scope, max, limit).await?;
        Ok(count.min(u64::from(limit)))
    }

    /// Runs all three lookups concurrently.
    pub async fn cursors(
        &self,
        scope: &ListingScope,
        window: &PageWindow,
        page_ids: &[i64],
    ) -> Result<PageCursors> {
        let (next, previous, remaining) = tokio::try_join!(
            self.next_cursor(scope, page_ids),
            self.previous_cursor(scope, window, page_ids),
            self.remaining_count(scope, page_ids, window.limit),
        )?;
        Ok(PageCursors { next, previous, remaining })
    }
}

/// Builds a relative listing URL: `extra` pairs (percent-encoded) first,
/// then the window parameters.
pub(crate) fn page_url(path: &str, extra: &[(&str, &str)], cursor_param: &str, limit: u32, cursor: i64) -> String {
    let mut query: Vec<String> = extra
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect();
    query.push(format!("limit={limit}"));
    query.push(format!("{cursor_param}={cursor}"));
    format!("{path}?{}", query.join("&"))
}
