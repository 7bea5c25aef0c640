//! Vote session and vote repositories.

use std::sync::Arc;

use jar_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder,
};

use crate::entities::vote_session::VoteSessionStatus;
use crate::entities::{Vote, VoteSession, vote, vote_session};

/// Repository for vote sessions and their ballots.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Session Operations ====================

    /// Find the active session for a jar, if any.
    pub async fn find_active_by_jar(&self, jar_id: &str) -> AppResult<Option<vote_session::Model>> {
        VoteSession::find()
            .filter(vote_session::Column::JarId.eq(jar_id))
            .filter(vote_session::Column::Status.eq(VoteSessionStatus::Active))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the most recently resolved session for a jar.
    pub async fn find_latest_completed(
        &self,
        jar_id: &str,
    ) -> AppResult<Option<vote_session::Model>> {
        VoteSession::find()
            .filter(vote_session::Column::JarId.eq(jar_id))
            .filter(vote_session::Column::Status.eq(VoteSessionStatus::Completed))
            .order_by(vote_session::Column::CreatedAt, Order::Desc)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a session. The partial unique index on
    /// `(jar_id) WHERE status = 'active'` rejects a second active session,
    /// closing the concurrent-start race.
    pub async fn create_session(
        &self,
        model: vote_session::ActiveModel,
    ) -> AppResult<vote_session::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::BadRequest("A vote is already in progress for this jar".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a session.
    pub async fn update_session(
        &self,
        model: vote_session::ActiveModel,
    ) -> AppResult<vote_session::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Vote Operations ====================

    /// List ballots cast in a session.
    pub async fn find_votes_by_session(&self, session_id: &str) -> AppResult<Vec<vote::Model>> {
        Vote::find()
            .filter(vote::Column::SessionId.eq(session_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has voted in a session.
    pub async fn has_voted(&self, session_id: &str, user_id: &str) -> AppResult<bool> {
        let count = Vote::find()
            .filter(vote::Column::SessionId.eq(session_id))
            .filter(vote::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Record a ballot. The `(session_id, user_id)` unique index rejects a
    /// second ballot from the same member, closing the double-vote race.
    pub async fn create_vote(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::BadRequest("You have already voted in this round".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::vote_session::TieBreakerMode;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_session(id: &str, jar_id: &str) -> vote_session::Model {
        vote_session::Model {
            id: id.to_string(),
            jar_id: jar_id.to_string(),
            status: VoteSessionStatus::Active,
            tie_breaker_mode: TieBreakerMode::RandomPick,
            round: 1,
            eligible_idea_ids: None,
            end_time: None,
            winner_id: None,
            started_by_id: "user1".to_string(),
            created_at: Utc::now().into(),
            resolved_at: None,
        }
    }

    fn create_test_vote(id: &str, session_id: &str, user_id: &str, idea_id: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            idea_id: idea_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_active_by_jar() {
        let session = create_test_session("sess1", "jar1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[session.clone()]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let result = repo.find_active_by_jar("jar1").await.unwrap();

        assert_eq!(result.unwrap().id, "sess1");
    }

    #[tokio::test]
    async fn test_has_voted() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        assert!(repo.has_voted("sess1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_votes_by_session() {
        let v1 = create_test_vote("v1", "sess1", "user2", "idea1");
        let v2 = create_test_vote("v2", "sess1", "user3", "idea1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[v1, v2]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let votes = repo.find_votes_by_session("sess1").await.unwrap();

        assert_eq!(votes.len(), 2);
    }
}
