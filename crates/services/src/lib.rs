//! # services
//!
//! Forum use-cases. Each service holds `Arc<dyn Port>` handles and is cheap
//! to clone; adapters are chosen by the binary and passed in through
//! [`Repositories`].

pub mod category_service;
pub mod feed;
pub mod log_service;
pub mod pagination;
pub mod post_service;
pub mod reply;
pub mod thread_service;
pub mod trending;
pub mod user_service;
pub mod validation;

use std::sync::Arc;

use chrono::Duration;
use domains::{
    CategoryRepository, CursorIndex, LogRepository, PostRepository, ThreadRepository, UserRepository,
};

pub use category_service::{CategoryOverview, CategoryService};
pub use feed::{CategoryFeed, CategorySelector, FeedAssembler};
pub use log_service::LogService;
pub use pagination::{derive_window, CursorPaginator, PageCursors};
pub use post_service::{CreatedPost, PostService};
pub use reply::ReplyIntegrityValidator;
pub use thread_service::{ThreadPage, ThreadService};
pub use trending::TrendingAggregator;
pub use user_service::{UserPage, UserService, UserView};

/// Tunables that come from configuration rather than from requests.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub trending_limit: usize,
    pub trending_window: Duration,
    pub default_category_color: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            trending_limit: 3,
            trending_window: Duration::hours(24),
            default_category_color: "#2196F3".to_string(),
        }
    }
}

/// One handle per port. A single store usually backs all of them.
#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<dyn CategoryRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub users: Arc<dyn UserRepository>,
    pub logs: Arc<dyn LogRepository>,
    pub cursors: Arc<dyn CursorIndex>,
}

impl Repositories {
    /// Uses one store for every port.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CategoryRepository
            + ThreadRepository
            + PostRepository
            + UserRepository
            + LogRepository
            + CursorIndex
            + 'static,
    {
        Self {
            categories: store.clone(),
            threads: store.clone(),
            posts: store.clone(),
            users: store.clone(),
            logs: store.clone(),
            cursors: store,
        }
    }
}

/// Every use-case, wired once at startup.
#[derive(Clone)]
pub struct ForumServices {
    pub categories: CategoryService,
    pub threads: ThreadService,
    pub posts: PostService,
    pub users: UserService,
    pub logs: LogService,
}

impl ForumServices {
    pub fn new(repos: Repositories, settings: ServiceSettings) -> Self {
        let paginator = CursorPaginator::new(repos.cursors.clone());
        let feed = FeedAssembler::new(
            repos.categories.clone(),
            repos.threads.clone(),
            repos.users.clone(),
            paginator.clone(),
        );

        Self {
            categories: CategoryService::new(
                repos.categories.clone(),
                repos.threads.clone(),
                feed,
                settings.default_category_color,
            ),
            threads: ThreadService::new(
                repos.categories.clone(),
                repos.threads.clone(),
                repos.posts.clone(),
                repos.users.clone(),
                paginator.clone(),
            ),
            posts: PostService::new(repos.threads.clone(), repos.posts.clone()),
            users: UserService::new(repos.users.clone(), repos.threads.clone(), repos.posts.clone(), paginator),
            logs: LogService::new(
                repos.logs,
                repos.threads,
                repos.users,
                settings.trending_limit,
                settings.trending_window,
            ),
        }
    }
}
