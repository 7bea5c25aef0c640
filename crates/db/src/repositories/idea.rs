//! Idea repository.

use std::sync::Arc;

use jar_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
};

use crate::entities::idea::IdeaStatus;
use crate::entities::{Idea, idea};

/// Idea repository for database operations.
#[derive(Clone)]
pub struct IdeaRepository {
    db: Arc<DatabaseConnection>,
}

impl IdeaRepository {
    /// Create a new idea repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an idea by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<idea::Model>> {
        Idea::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an idea by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<idea::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Idea not found: {id}")))
    }

    /// List ideas in a jar, newest first.
    pub async fn find_by_jar(
        &self,
        jar_id: &str,
        include_selected: bool,
    ) -> AppResult<Vec<idea::Model>> {
        let mut query = Idea::find().filter(idea::Column::JarId.eq(jar_id));
        if !include_selected {
            query = query.filter(idea::Column::SelectedAt.is_null());
        }
        query
            .order_by(idea::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the candidate pool of a jar: approved, not yet selected.
    pub async fn find_candidates(&self, jar_id: &str) -> AppResult<Vec<idea::Model>> {
        Idea::find()
            .filter(idea::Column::JarId.eq(jar_id))
            .filter(idea::Column::Status.eq(IdeaStatus::Approved))
            .filter(idea::Column::SelectedAt.is_null())
            .order_by(idea::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new idea.
    pub async fn create(&self, model: idea::ActiveModel) -> AppResult<idea::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an idea.
    pub async fn update(&self, model: idea::ActiveModel) -> AppResult<idea::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an idea.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Idea::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_idea(id: &str, jar_id: &str, author: &str) -> idea::Model {
        idea::Model {
            id: id.to_string(),
            jar_id: jar_id.to_string(),
            created_by_id: author.to_string(),
            description: "Try the new ramen place".to_string(),
            category: Some("food".to_string()),
            cost_level: Some(2),
            time_minutes: Some(90),
            is_private: false,
            is_surprise: false,
            status: IdeaStatus::Approved,
            selected_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_candidates() {
        let idea1 = create_test_idea("idea1", "jar1", "user1");
        let idea2 = create_test_idea("idea2", "jar1", "user2");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[idea1, idea2]])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let result = repo.find_candidates("jar1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(idea::Model::is_candidate));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<idea::Model>::new()])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
