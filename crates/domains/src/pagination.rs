//! Pagination primitives shared by every listing.
//!
//! Cursors are primary-key watermarks: a window is "ids >= cursor, ascending,
//! at most `limit` rows", so rows inserted after a page was delivered never
//! shift earlier pages.

use serde::Deserialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Raw listing query parameters. Values stay unparsed so malformed input can
/// degrade to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub from: Option<String>,
    #[serde(rename = "lastId")]
    pub last_id: Option<String>,
    pub username: Option<String>,
}

/// Bounds of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Inclusive lower id bound; `None` starts from the beginning.
    pub cursor: Option<i64>,
    pub limit: u32,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self { cursor: None, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl PageWindow {
    pub fn admits(&self, id: i64) -> bool {
        self.cursor.is_none_or(|cursor| id >= cursor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadFilter {
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl ThreadFilter {
    pub fn matches(&self, category_id: i64, user_id: i64) -> bool {
        self.category_id.is_none_or(|c| c == category_id) && self.user_id.is_none_or(|u| u == user_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub thread_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl PostFilter {
    pub fn matches(&self, thread_id: i64, user_id: i64) -> bool {
        self.thread_id.is_none_or(|t| t == thread_id) && self.user_id.is_none_or(|u| u == user_id)
    }
}

/// The id-ordered collection a cursor walks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    Threads(ThreadFilter),
    Posts(PostFilter),
}

/// Which post of each thread a listing carries along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEdge {
    /// Lowest id: the opening post.
    First,
    /// Highest id: the most recent reply.
    Latest,
}
