use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    DomainError, ForumError, LogEntry, LogRepository, LogRoute, NewLogEntry, Result, Session,
    ThreadRepository, ThreadViews, UserRepository,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::trending::TrendingAggregator;
use crate::validation::BodyReader;

#[derive(Clone)]
pub struct LogService {
    logs: Arc<dyn LogRepository>,
    threads: Arc<dyn ThreadRepository>,
    users: Arc<dyn UserRepository>,
    trending: TrendingAggregator,
    trending_limit: usize,
    trending_window: Duration,
}

impl LogService {
    pub fn new(
        logs: Arc<dyn LogRepository>,
        threads: Arc<dyn ThreadRepository>,
        users: Arc<dyn UserRepository>,
        trending_limit: usize,
        trending_window: Duration,
    ) -> Self {
        let trending = TrendingAggregator::new(logs.clone(), threads.clone());
        Self { logs, threads, users, trending, trending_limit, trending_window }
    }

    /// Records one page view. `resourceId` names the thread or user the page
    /// is about; settings pages need a signed-in caller.
    #[instrument(skip(self, session, body))]
    pub async fn record(&self, session: Option<&Session>, body: &Value) -> Result<LogEntry> {
        let mut reader = BodyReader::new(body);
        let route = reader.required_string("route");
        let resource_id = reader.optional_integer("resourceId");
        let route = reader.finish(route)?;
        let route = LogRoute::parse(&route)
            .ok_or_else(|| DomainError::Rule(ForumError::invalid_parameter("route", "route does not exist")))?;

        let mut entry = NewLogEntry {
            route,
            thread_id: None,
            user_id: None,
            session_user_id: session.map(|session| session.user_id),
            created_at: Utc::now(),
        };

        match route {
            LogRoute::Thread => {
                let thread = match resource_id {
                    Some(id) => self.threads.find_by_id(id).await?,
                    None => None,
                };
                let thread = thread.ok_or_else(|| {
                    DomainError::Rule(ForumError::invalid_parameter("resourceId", "thread does not exist"))
                })?;
                entry.thread_id = Some(thread.id);
            }
            LogRoute::UserPosts | LogRoute::UserThreads => {
                let user = match resource_id {
                    Some(id) => self.users.find_by_id(id).await?,
                    None => None,
                };
                let user = user.ok_or_else(|| {
                    DomainError::Rule(ForumError::invalid_parameter("resourceId", "user does not exist"))
                })?;
                entry.user_id = Some(user.id);
            }
            route if route.requires_session() && session.is_none() => {
                return Err(DomainError::Rule(ForumError::RequestNotAuthorized));
            }
            _ => {}
        }

        let entry = self.logs.append(entry).await?;
        debug!(log_id = entry.id, route = entry.route.as_str(), "page view recorded");
        Ok(entry)
    }

    /// Most viewed threads over the configured trailing window.
    pub async fn top_threads(&self) -> Result<Vec<ThreadViews>> {
        self.trending.top_threads(self.trending_limit, self.trending_window).await
    }
}
