//! # Trending Aggregator
//!
//! Ranks threads by page views inside a trailing time window. Recomputed on
//! every call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::{LogRepository, LogRoute, Result, Thread, ThreadRepository, ThreadViews};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct TrendingAggregator {
    logs: Arc<dyn LogRepository>,
    threads: Arc<dyn ThreadRepository>,
}

impl TrendingAggregator {
    pub fn new(logs: Arc<dyn LogRepository>, threads: Arc<dyn ThreadRepository>) -> Self {
        Self { logs, threads }
    }

    pub async fn top_threads(&self, n: usize, window: Duration) -> Result<Vec<ThreadViews>> {
        self.top_threads_at(n, window, Utc::now()).await
    }

    /// Top `n` threads by views in `[now - window, now]`. Equal counts are
    /// ordered by ascending thread id.
    #[instrument(skip(self))]
    pub async fn top_threads_at(&self, n: usize, window: Duration, now: DateTime<Utc>) -> Result<Vec<ThreadViews>> {
        let entries = self.logs.entries_between(LogRoute::Thread, now - window, now).await?;

        let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
        for thread_id in entries.iter().filter_map(|entry| entry.thread_id) {
            *counts.entry(thread_id).or_default() += 1;
        }

        let mut ranked: Vec<(i64, u64)> = counts.into_iter().collect();
        // stable sort keeps ascending id among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        debug!(views = entries.len(), ranked = ranked.len(), "thread views aggregated");

        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = ranked.iter().map(|(id, _)| *id).collect();
        let mut threads: HashMap<i64, Thread> = self
            .threads
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|thread| (thread.id, thread))
            .collect();

        Ok(ranked
            .into_iter()
            .filter_map(|(id, page_views)| {
                threads.remove(&id).map(|thread| ThreadViews { thread, page_views })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{LogEntry, MockLogRepository, MockThreadRepository};

    fn view(id: i64, thread_id: i64, at: DateTime<Utc>) -> LogEntry {
        LogEntry {
            id,
            route: LogRoute::Thread,
            thread_id: Some(thread_id),
            user_id: None,
            session_user_id: None,
            created_at: at,
        }
    }

    fn thread(id: i64) -> Thread {
        Thread {
            id,
            title: format!("thread {id}"),
            category_id: 1,
            user_id: 1,
            created_at: Utc::now(),
        }
    }

    fn aggregator(views: Vec<(i64, i64)>) -> TrendingAggregator {
        let now = Utc::now();
        let mut logs = MockLogRepository::new();
        logs.expect_entries_between().returning(move |route, _, _| {
            assert_eq!(route, LogRoute::Thread);
            Ok(views.iter().map(|(id, thread_id)| view(*id, *thread_id, now)).collect())
        });
        let mut threads = MockThreadRepository::new();
        threads
            .expect_find_many()
            .returning(|ids| Ok(ids.iter().rev().map(|id| thread(*id)).collect()));
        TrendingAggregator::new(Arc::new(logs), Arc::new(threads))
    }

    #[tokio::test]
    async fn ranks_by_view_count_descending() {
        let aggregator = aggregator(vec![(1, 10), (2, 20), (3, 20), (4, 30), (5, 20), (6, 30)]);
        let top = aggregator.top_threads(3, Duration::hours(24)).await.unwrap();
        let shape: Vec<(i64, u64)> = top.iter().map(|t| (t.thread.id, t.page_views)).collect();
        assert_eq!(shape, vec![(20, 3), (30, 2), (10, 1)]);
    }

    #[tokio::test]
    async fn ties_break_by_thread_id_on_every_call() {
        let aggregator = aggregator(vec![(1, 9), (2, 4), (3, 7), (4, 4), (5, 9), (6, 7)]);
        for _ in 0..3 {
            let top = aggregator.top_threads(2, Duration::hours(24)).await.unwrap();
            let ids: Vec<i64> = top.iter().map(|t| t.thread.id).collect();
            assert_eq!(ids, vec![4, 7]);
        }
    }

    #[tokio::test]
    async fn empty_window_yields_nothing() {
        let mut logs = MockLogRepository::new();
        logs.expect_entries_between().returning(|_, _, _| Ok(vec![]));
        let aggregator = TrendingAggregator::new(Arc::new(logs), Arc::new(MockThreadRepository::new()));
        assert!(aggregator.top_threads(3, Duration::hours(24)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn window_bounds_are_passed_to_the_store() {
        let now = Utc::now();
        let mut logs = MockLogRepository::new();
        logs.expect_entries_between()
            .withf(move |_, from, to| *to == now && *from == now - Duration::hours(24))
            .returning(|_, _, _| Ok(vec![]));
        let aggregator = TrendingAggregator::new(Arc::new(logs), Arc::new(MockThreadRepository::new()));
        aggregator.top_threads_at(3, Duration::hours(24), now).await.unwrap();
    }
}
