use std::sync::Arc;

use domains::{
    category_value, Category, CategoryRepository, DomainError, ForumError, NewCategory, PageParams,
    PageWindow, PostEdge, RepoError, Result, ThreadFilter, ThreadListing, ThreadRepository,
    ALL_CATEGORIES,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::feed::{CategoryFeed, CategorySelector, FeedAssembler};
use crate::validation::BodyReader;

pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

/// A category with a preview of its oldest thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOverview {
    #[serde(flatten)]
    pub category: Category,
    pub threads: Vec<ThreadListing>,
}

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    threads: Arc<dyn ThreadRepository>,
    feed: FeedAssembler,
    default_color: String,
}

impl CategoryService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        threads: Arc<dyn ThreadRepository>,
        feed: FeedAssembler,
        default_color: String,
    ) -> Self {
        Self { categories, threads, feed, default_color }
    }

    /// Every category, each with its first thread and that thread's opening post.
    pub async fn overview(&self) -> Result<Vec<CategoryOverview>> {
        let window = PageWindow { cursor: None, limit: 1 };
        let mut overview = Vec::new();
        for category in self.categories.list().await? {
            let filter = ThreadFilter { category_id: Some(category.id), user_id: None };
            let threads = self.threads.list_with_edge_post(&filter, &window, PostEdge::First).await?;
            overview.push(CategoryOverview { category, threads });
        }
        Ok(overview)
    }

    pub async fn feed(&self, category: &str, params: &PageParams) -> Result<CategoryFeed> {
        self.feed.assemble(&CategorySelector::parse(category), params).await
    }

    #[instrument(skip(self, body))]
    pub async fn create(&self, body: &Value) -> Result<Category> {
        let mut reader = BodyReader::new(body);
        let name = reader.required_text("name", MAX_CATEGORY_NAME_LENGTH);
        let color = reader.optional_string("color");
        let name = reader.finish(name)?;

        if category_value(&name) == ALL_CATEGORIES {
            return Err(DomainError::Rule(ForumError::invalid_parameter("name", "name is reserved")));
        }

        let draft = NewCategory {
            name: name.trim().to_string(),
            color: color.unwrap_or_else(|| self.default_color.clone()),
        };
        match self.categories.create(draft).await {
            Ok(category) => {
                info!(category_id = category.id, value = %category.value, "category created");
                Ok(category)
            }
            Err(RepoError::Conflict(reason)) => {
                warn!(%reason, "duplicate category rejected");
                Err(DomainError::Rule(ForumError::CategoryAlreadyExists))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::CursorPaginator;
    use chrono::Utc;
    use domains::{MockCategoryRepository, MockCursorIndex, MockThreadRepository, MockUserRepository};
    use serde_json::json;

    fn service(categories: MockCategoryRepository) -> CategoryService {
        let categories: Arc<dyn CategoryRepository> = Arc::new(categories);
        let threads: Arc<dyn ThreadRepository> = Arc::new(MockThreadRepository::new());
        let feed = FeedAssembler::new(
            categories.clone(),
            threads.clone(),
            Arc::new(MockUserRepository::new()),
            CursorPaginator::new(Arc::new(MockCursorIndex::new())),
        );
        CategoryService::new(categories, threads, feed, "#888888".into())
    }

    #[tokio::test]
    async fn creates_with_derived_value_and_default_color() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_create()
            .withf(|draft| draft.name == "Off Topic" && draft.color == "#888888" && draft.value() == "OFF_TOPIC")
            .returning(|draft| {
                Ok(Category {
                    id: 1,
                    value: draft.value(),
                    name: draft.name,
                    color: draft.color,
                    created_at: Utc::now(),
                })
            });

        let category = service(categories).create(&json!({ "name": " Off Topic " })).await.unwrap();
        assert_eq!(category.value, "OFF_TOPIC");
    }

    #[tokio::test]
    async fn validation_errors_are_batched() {
        let err = service(MockCategoryRepository::new())
            .create(&json!({ "name": 12, "color": false }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(vec![
                ForumError::invalid_parameter_type("name", "string"),
                ForumError::invalid_parameter_type("color", "string"),
            ])
        );
    }

    #[tokio::test]
    async fn reserved_value_is_rejected() {
        let err = service(MockCategoryRepository::new())
            .create(&json!({ "name": "all" }))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Rule(ForumError::invalid_parameter("name", "name is reserved")));
    }

    #[tokio::test]
    async fn duplicate_maps_to_category_already_exists() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_create()
            .returning(|_| Err(RepoError::Conflict("categories_name_key".into())));

        let err = service(categories).create(&json!({ "name": "General" })).await.unwrap_err();
        assert_eq!(err, DomainError::Rule(ForumError::CategoryAlreadyExists));
    }
}
