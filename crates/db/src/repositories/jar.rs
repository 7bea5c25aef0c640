//! Jar repository.

use std::sync::Arc;

use jar_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder,
};

use crate::entities::jar_member::JarRole;
use crate::entities::{Jar, JarMember, jar, jar_member};

/// Repository for jar and membership operations.
#[derive(Clone)]
pub struct JarRepository {
    db: Arc<DatabaseConnection>,
}

impl JarRepository {
    /// Create a new jar repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get reference to the database connection.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    // ==================== Jar Operations ====================

    /// Find jar by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<jar::Model>> {
        Jar::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get jar by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<jar::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Jar not found: {id}")))
    }

    /// Find a jar by its invite code.
    pub async fn find_by_reference_code(&self, code: &str) -> AppResult<Option<jar::Model>> {
        Jar::find()
            .filter(jar::Column::ReferenceCode.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find jars by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<jar::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        Jar::find()
            .filter(jar::Column::Id.is_in(ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new jar.
    pub async fn create(&self, model: jar::ActiveModel) -> AppResult<jar::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a jar.
    pub async fn update(&self, model: jar::ActiveModel) -> AppResult<jar::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically adjust the denormalized member count.
    pub async fn adjust_members_count(&self, jar_id: &str, delta: i64) -> AppResult<()> {
        Jar::update_many()
            .col_expr(
                jar::Column::MembersCount,
                Expr::col(jar::Column::MembersCount).add(delta),
            )
            .filter(jar::Column::Id.eq(jar_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a jar. Members, ideas, and sessions cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Jar::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ==================== Membership Operations ====================

    /// Find a user's memberships across jars, newest first.
    pub async fn find_memberships_by_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<jar_member::Model>> {
        JarMember::find()
            .filter(jar_member::Column::UserId.eq(user_id))
            .order_by(jar_member::Column::JoinedAt, Order::Desc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user's membership in a jar.
    pub async fn find_member(
        &self,
        jar_id: &str,
        user_id: &str,
    ) -> AppResult<Option<jar_member::Model>> {
        JarMember::find()
            .filter(jar_member::Column::JarId.eq(jar_id))
            .filter(jar_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List jar members, oldest first.
    pub async fn find_members(&self, jar_id: &str) -> AppResult<Vec<jar_member::Model>> {
        JarMember::find()
            .filter(jar_member::Column::JarId.eq(jar_id))
            .order_by(jar_member::Column::JoinedAt, Order::Asc)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count jar members.
    pub async fn count_members(&self, jar_id: &str) -> AppResult<u64> {
        JarMember::find()
            .filter(jar_member::Column::JarId.eq(jar_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count jar admins.
    pub async fn count_admins(&self, jar_id: &str) -> AppResult<u64> {
        JarMember::find()
            .filter(jar_member::Column::JarId.eq(jar_id))
            .filter(jar_member::Column::Role.eq(JarRole::Admin))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a member. The `(jar_id, user_id)` unique index rejects
    /// duplicate joins.
    pub async fn add_member(&self, model: jar_member::ActiveModel) -> AppResult<jar_member::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                AppError::BadRequest("You are already a member of this jar".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a membership (role changes).
    pub async fn update_member(
        &self,
        model: jar_member::ActiveModel,
    ) -> AppResult<jar_member::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove a member from a jar.
    pub async fn remove_member(&self, jar_id: &str, user_id: &str) -> AppResult<()> {
        JarMember::delete_many()
            .filter(jar_member::Column::JarId.eq(jar_id))
            .filter(jar_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
