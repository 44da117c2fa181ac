use std::sync::Arc;

use domains::SessionVerifier;
use services::ForumServices;

use crate::metrics::Metrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ForumServices>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: ForumServices, sessions: Arc<dyn SessionVerifier>) -> Self {
        Self {
            services: Arc::new(services),
            sessions,
            metrics: Arc::new(Metrics::new()),
        }
    }
}
