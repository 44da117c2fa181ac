//! # Feed Assembler
//!
//! Builds category listings. Every window is fetched twice with the same
//! filter and thread order: once carrying each thread's opening post, once
//! carrying its most recent post. The second result is folded into the first
//! by thread id, so a thread with newer replies shows both posts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use domains::{
    Category, CategoryRepository, DomainError, ForumError, ListingScope, PageParams, PageWindow,
    Post, PostEdge, Result, ThreadFilter, ThreadListing, ThreadRepository, UserRepository,
    ALL_CATEGORIES,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::pagination::{derive_window, page_url, CursorPaginator};

/// Which categories a listing spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelector {
    /// The synthetic view concatenating every category.
    All,
    /// A single category, by name or value.
    Key(String),
}

impl CategorySelector {
    pub fn parse(raw: &str) -> Self {
        if raw == ALL_CATEGORIES {
            CategorySelector::All
        } else {
            CategorySelector::Key(raw.to_string())
        }
    }
}

impl fmt::Display for CategorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelector::All => f.write_str(ALL_CATEGORIES),
            CategorySelector::Key(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadsMeta {
    #[serde(rename = "nextURL")]
    pub next_url: Option<String>,
    #[serde(rename = "nextThreadsCount")]
    pub next_threads_count: u64,
}

/// One page of a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFeed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub threads: Vec<ThreadListing>,
    pub meta: ThreadsMeta,
}

#[derive(Clone)]
pub struct FeedAssembler {
    categories: Arc<dyn CategoryRepository>,
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserRepository>,
    paginator: CursorPaginator,
}

impl FeedAssembler {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserRepository>,
        paginator: CursorPaginator,
    ) -> Self {
        Self { categories, threads, users, paginator }
    }

    #[instrument(skip(self, params), fields(category = %selector))]
    pub async fn assemble(&self, selector: &CategorySelector, params: &PageParams) -> Result<CategoryFeed> {
        let window = derive_window(params);
        let user_id = user_filter(self.users.as_ref(), params.username.as_deref()).await?;

        let (header, categories) = match selector {
            CategorySelector::All => (None, self.categories.list().await?),
            CategorySelector::Key(key) => {
                let category = self.categories.find_by_key(key).await?.ok_or_else(|| {
                    DomainError::Rule(ForumError::invalid_parameter("category", "category does not exist"))
                })?;
                (Some(category.clone()), vec![category])
            }
        };

        // One window over the whole scope: for ALL the page spans every
        // category, so the shared cursor never skips threads.
        let filter = ThreadFilter {
            category_id: header.as_ref().map(|category| category.id),
            user_id,
        };
        let rank: HashMap<i64, usize> = categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.id, position))
            .collect();

        // Both queries share filter, window and thread order; only the post
        // edge differs.
        let (primary, latest) = tokio::try_join!(
            self.collect(&filter, &rank, &window, PostEdge::First),
            self.collect(&filter, &rank, &window, PostEdge::Latest),
        )?;
        let threads = merge_latest(primary, latest);

        let scope = ListingScope::Threads(filter);
        let ids: Vec<i64> = threads.iter().map(|listing| listing.thread.id).collect();
        let (next, remaining) = tokio::try_join!(
            self.paginator.next_cursor(&scope, &ids),
            self.paginator.remaining_count(&scope, &ids, window.limit),
        )?;
        debug!(threads = ids.len(), ?next, remaining, "category feed assembled");

        let meta = match next {
            Some(cursor) => {
                let path = format!("/api/v1/category/{}", urlencoding::encode(&selector.to_string()));
                let extra: Vec<(&str, &str)> = params
                    .username
                    .as_deref()
                    .map(|username| vec![("username", username)])
                    .unwrap_or_default();
                ThreadsMeta {
                    next_url: Some(page_url(&path, &extra, "from", window.limit, cursor)),
                    next_threads_count: remaining,
                }
            }
            None => ThreadsMeta { next_url: None, next_threads_count: 0 },
        };

        Ok(match header {
            None => CategoryFeed {
                id: None,
                name: "All".to_string(),
                value: ALL_CATEGORIES.to_string(),
                color: None,
                threads,
                meta,
            },
            Some(Category { id, name, value, color, .. }) => {
                CategoryFeed { id: Some(id), name, value, color: Some(color), threads, meta }
            }
        })
    }

    /// One window of threads, grouped by category in `rank` order and
    /// ascending by id inside each category.
    async fn collect(
        &self,
        filter: &ThreadFilter,
        rank: &HashMap<i64, usize>,
        window: &PageWindow,
        edge: PostEdge,
    ) -> Result<Vec<ThreadListing>> {
        let mut listings = self.threads.list_with_edge_post(filter, window, edge).await?;
        // stable: keeps id order within a category
        listings.sort_by_key(|listing| rank.get(&listing.thread.category_id).copied().unwrap_or(usize::MAX));
        Ok(listings)
    }
}

/// Appends each thread's latest post to its listing when it differs from the
/// opening post. Matching is by thread id, so threads missing from `latest`
/// are left untouched.
pub fn merge_latest(primary: Vec<ThreadListing>, latest: Vec<ThreadListing>) -> Vec<ThreadListing> {
    let mut newest: HashMap<i64, Post> = latest
        .into_iter()
        .filter_map(|listing| {
            let id = listing.thread.id;
            listing.posts.into_iter().next().map(|post| (id, post))
        })
        .collect();

    primary
        .into_iter()
        .map(|mut listing| {
            if let Some(post) = newest.remove(&listing.thread.id) {
                if listing.posts.first().map(|first| first.id) != Some(post.id) {
                    listing.posts.push(post);
                }
            }
            listing
        })
        .collect()
}

/// Resolves the optional `username` filter to a user id.
pub(crate) async fn user_filter(users: &dyn UserRepository, username: Option<&str>) -> Result<Option<i64>> {
    let Some(username) = username else {
        return Ok(None);
    };
    match users.find_by_username(username).await? {
        Some(user) => Ok(Some(user.id)),
        None => Err(DomainError::Rule(ForumError::invalid_parameter("username", "user does not exist"))),
    }
}
