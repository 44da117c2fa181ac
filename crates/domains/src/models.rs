//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! Every id is a monotonic integer assigned by the store, so id order is
//! creation order and doubles as the pagination key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of the synthetic "every category" listing.
pub const ALL_CATEGORIES: &str = "ALL";

/// A top-level bucket of threads (e.g. "General", "Off Topic").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Uppercased, underscored form of `name`; fixed at creation.
    pub value: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a category insert. `value` is derived, never supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

impl NewCategory {
    pub fn value(&self) -> String {
        category_value(&self.name)
    }
}

/// Derives a category value: trimmed, whitespace replaced by `_`, uppercased.
pub fn category_value(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect::<String>()
        .to_uppercase()
}

/// A Thread owns an ordered sequence of Posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub category_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub category_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub content: String,
    pub thread_id: i64,
    pub user_id: i64,
    /// Non-owning back-reference; the target always shares `thread_id`.
    pub replying_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub content: String,
    pub thread_id: i64,
    pub user_id: i64,
    pub replying_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Forum member as provisioned by the external account system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub color: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub color: String,
    pub admin: bool,
}

/// Page kinds a client reports views for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogRoute {
    Index,
    Thread,
    UserPosts,
    UserThreads,
    SettingsGeneral,
    SettingsAccount,
}

impl LogRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            LogRoute::Index => "index",
            LogRoute::Thread => "thread",
            LogRoute::UserPosts => "userPosts",
            LogRoute::UserThreads => "userThreads",
            LogRoute::SettingsGeneral => "settingsGeneral",
            LogRoute::SettingsAccount => "settingsAccount",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            LogRoute::Index,
            LogRoute::Thread,
            LogRoute::UserPosts,
            LogRoute::UserThreads,
            LogRoute::SettingsGeneral,
            LogRoute::SettingsAccount,
        ]
        .into_iter()
        .find(|route| route.as_str() == raw)
    }

    /// Settings pages are only reachable by signed-in users.
    pub fn requires_session(self) -> bool {
        matches!(self, LogRoute::SettingsGeneral | LogRoute::SettingsAccount)
    }
}

/// Immutable page-view record used for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub route: LogRoute,
    pub thread_id: Option<i64>,
    pub user_id: Option<i64>,
    pub session_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub route: LogRoute,
    pub thread_id: Option<i64>,
    pub user_id: Option<i64>,
    pub session_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A thread together with a slice of its posts, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListing {
    #[serde(flatten)]
    pub thread: Thread,
    pub posts: Vec<Post>,
}

/// A thread and the number of times it was viewed in a time window.
/// Serialized as `{"Thread": {..}, "pageViews": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadViews {
    #[serde(rename = "Thread")]
    pub thread: Thread,
    pub page_views: u64,
}

/// Identity of the caller, resolved by the external session system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub admin: bool,
}
