//! Jar service: collections, membership, and roles.

use chrono::Utc;
use jar_common::{AppError, AppResult, IdGenerator};
use jar_db::entities::jar::SelectionMode;
use jar_db::entities::jar_member::JarRole;
use jar_db::entities::notification::NotificationKind;
use jar_db::entities::{jar, jar_member, user};
use jar_db::repositories::{JarRepository, UserRepository};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::notification::NotificationService;

/// Input for creating a jar.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJarInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub topic: Option<String>,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default)]
    pub requires_approval: bool,
}

/// Input for updating a jar.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJarInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(max = 2048))]
    pub description: Option<Option<String>>,
    #[validate(length(max = 64))]
    pub topic: Option<Option<String>>,
    pub selection_mode: Option<SelectionMode>,
    pub requires_approval: Option<bool>,
}

/// Jar as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JarResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub reference_code: String,
    pub selection_mode: SelectionMode,
    pub requires_approval: bool,
    pub members_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub my_role: Option<JarRole>,
}

impl JarResponse {
    #[must_use]
    pub fn from_model(model: jar::Model, my_role: Option<JarRole>) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            name: model.name,
            description: model.description,
            topic: model.topic,
            reference_code: model.reference_code,
            selection_mode: model.selection_mode,
            requires_approval: model.requires_approval,
            members_count: model.members_count,
            created_at: model.created_at.into(),
            my_role,
        }
    }
}

/// Jar member as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JarMemberResponse {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub role: JarRole,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// Service for managing jars and their members.
#[derive(Clone)]
pub struct JarService {
    jar_repo: JarRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl JarService {
    /// Create a new jar service.
    #[must_use]
    pub const fn new(
        jar_repo: JarRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            jar_repo,
            user_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    /// Membership lookup that errors for non-members.
    pub async fn require_member(
        &self,
        jar_id: &str,
        user_id: &str,
    ) -> AppResult<jar_member::Model> {
        self.jar_repo
            .find_member(jar_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this jar".to_string()))
    }

    /// Membership lookup that errors unless the user is a jar admin.
    pub async fn require_admin(&self, jar_id: &str, user_id: &str) -> AppResult<jar_member::Model> {
        let member = self.require_member(jar_id, user_id).await?;
        if !member.role.is_admin() {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }
        Ok(member)
    }

    /// Create a jar. The creator becomes its first admin member.
    pub async fn create(&self, owner: &user::Model, input: CreateJarInput) -> AppResult<JarResponse> {
        input.validate()?;

        let jar_model = jar::ActiveModel {
            id: Set(self.id_gen.generate()),
            owner_id: Set(owner.id.clone()),
            name: Set(input.name),
            description: Set(input.description),
            topic: Set(input.topic),
            reference_code: Set(self.id_gen.generate_reference_code()),
            selection_mode: Set(input.selection_mode),
            requires_approval: Set(input.requires_approval),
            members_count: Set(1),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.jar_repo.create(jar_model).await?;

        let member = jar_member::ActiveModel {
            id: Set(self.id_gen.generate()),
            jar_id: Set(created.id.clone()),
            user_id: Set(owner.id.clone()),
            role: Set(JarRole::Admin),
            joined_at: Set(Utc::now().into()),
        };
        self.jar_repo.add_member(member).await?;

        Ok(JarResponse::from_model(created, Some(JarRole::Admin)))
    }

    /// Get a jar. Member-only.
    pub async fn get(&self, jar_id: &str, user: &user::Model) -> AppResult<JarResponse> {
        let member = self.require_member(jar_id, &user.id).await?;
        let jar = self.jar_repo.get_by_id(jar_id).await?;
        Ok(JarResponse::from_model(jar, Some(member.role)))
    }

    /// List jars the user belongs to, newest membership first.
    pub async fn list(&self, user: &user::Model) -> AppResult<Vec<JarResponse>> {
        let memberships = self.jar_repo.find_memberships_by_user(&user.id).await?;
        let jar_ids: Vec<String> = memberships.iter().map(|m| m.jar_id.clone()).collect();
        let jars = self.jar_repo.find_by_ids(&jar_ids).await?;

        Ok(memberships
            .into_iter()
            .filter_map(|m| {
                jars.iter()
                    .find(|j| j.id == m.jar_id)
                    .cloned()
                    .map(|j| JarResponse::from_model(j, Some(m.role)))
            })
            .collect())
    }

    /// Update jar settings. Admin-only.
    pub async fn update(
        &self,
        jar_id: &str,
        user: &user::Model,
        input: UpdateJarInput,
    ) -> AppResult<JarResponse> {
        input.validate()?;
        let member = self.require_admin(jar_id, &user.id).await?;
        let jar = self.jar_repo.get_by_id(jar_id).await?;

        let mut active: jar::ActiveModel = jar.into();
        active.name = input.name.map_or(NotSet, Set);
        active.description = input.description.map_or(NotSet, Set);
        active.topic = input.topic.map_or(NotSet, Set);
        active.selection_mode = input.selection_mode.map_or(NotSet, Set);
        active.requires_approval = input.requires_approval.map_or(NotSet, Set);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.jar_repo.update(active).await?;
        Ok(JarResponse::from_model(updated, Some(member.role)))
    }

    /// Delete a jar. Admin-only; members, ideas, and sessions cascade.
    pub async fn delete(&self, jar_id: &str, user: &user::Model) -> AppResult<()> {
        self.require_admin(jar_id, &user.id).await?;
        self.jar_repo.delete(jar_id).await
    }

    /// Join a jar by invite code.
    pub async fn join(&self, reference_code: &str, user: &user::Model) -> AppResult<JarResponse> {
        let jar = self
            .jar_repo
            .find_by_reference_code(reference_code)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid invite code".to_string()))?;

        let member = jar_member::ActiveModel {
            id: Set(self.id_gen.generate()),
            jar_id: Set(jar.id.clone()),
            user_id: Set(user.id.clone()),
            role: Set(JarRole::Member),
            joined_at: Set(Utc::now().into()),
        };
        self.jar_repo.add_member(member).await?;
        self.jar_repo.adjust_members_count(&jar.id, 1).await?;

        let joined_name = user.display_name.clone().unwrap_or_else(|| user.username.clone());
        if let Err(e) = self
            .notifications
            .notify_jar_members(
                &jar.id,
                Some(&user.id),
                Some(&user.id),
                NotificationKind::MemberJoined,
                format!("{joined_name} joined {}", jar.name),
            )
            .await
        {
            tracing::warn!(error = %e, jar_id = %jar.id, "Failed to fan out join notification");
        }

        Ok(JarResponse::from_model(jar, Some(JarRole::Member)))
    }

    /// Leave a jar. The last admin cannot leave.
    pub async fn leave(&self, jar_id: &str, user: &user::Model) -> AppResult<()> {
        let member = self.require_member(jar_id, &user.id).await?;

        if member.role.is_admin() && self.jar_repo.count_admins(jar_id).await? <= 1 {
            return Err(AppError::BadRequest(
                "Promote another admin before leaving this jar".to_string(),
            ));
        }

        self.jar_repo.remove_member(jar_id, &user.id).await?;
        self.jar_repo.adjust_members_count(jar_id, -1).await
    }

    /// List jar members with profile data. Member-only.
    pub async fn members(
        &self,
        jar_id: &str,
        user: &user::Model,
    ) -> AppResult<Vec<JarMemberResponse>> {
        self.require_member(jar_id, &user.id).await?;

        let memberships = self.jar_repo.find_members(jar_id).await?;
        let user_ids: Vec<String> = memberships.iter().map(|m| m.user_id.clone()).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        Ok(memberships
            .into_iter()
            .filter_map(|m| {
                users.iter().find(|u| u.id == m.user_id).map(|u| JarMemberResponse {
                    user_id: u.id.clone(),
                    username: u.username.clone(),
                    display_name: u.display_name.clone(),
                    role: m.role,
                    joined_at: m.joined_at.into(),
                })
            })
            .collect())
    }

    /// Change a member's role. Admin-only; the last admin cannot demote
    /// themselves.
    pub async fn update_member_role(
        &self,
        jar_id: &str,
        caller: &user::Model,
        target_user_id: &str,
        role: JarRole,
    ) -> AppResult<()> {
        self.require_admin(jar_id, &caller.id).await?;

        let target = self
            .jar_repo
            .find_member(jar_id, target_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        if target.role.is_admin()
            && role == JarRole::Member
            && self.jar_repo.count_admins(jar_id).await? <= 1
        {
            return Err(AppError::BadRequest(
                "A jar must keep at least one admin".to_string(),
            ));
        }

        let mut active: jar_member::ActiveModel = target.into();
        active.role = Set(role);
        self.jar_repo.update_member(active).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jar_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            display_name: None,
            xp: 0,
            notify_votes: true,
            notify_ideas: true,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_member(jar_id: &str, user_id: &str, role: JarRole) -> jar_member::Model {
        jar_member::Model {
            id: format!("m-{user_id}"),
            jar_id: jar_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now().into(),
        }
    }

    fn service_with(jar_db: sea_orm::DatabaseConnection) -> JarService {
        let jar_repo = JarRepository::new(Arc::new(jar_db));
        let user_repo = UserRepository::new(Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        ));
        let notification_repo = NotificationRepository::new(Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        ));
        let notifications = NotificationService::new(
            notification_repo,
            JarRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
        );
        JarService::new(jar_repo, user_repo, notifications)
    }

    #[tokio::test]
    async fn test_require_member_rejects_outsider() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<jar_member::Model>::new()])
            .into_connection();

        let service = service_with(db);
        let result = service.require_member("jar1", "stranger").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_require_admin_rejects_plain_member() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_member("jar1", "user1", JarRole::Member)]])
            .into_connection();

        let service = service_with(db);
        let result = service.require_admin("jar1", "user1").await;

        assert!(matches!(result, Err(AppError::Forbidden(msg)) if msg == "Admin only"));
    }

    #[tokio::test]
    async fn test_leave_blocks_last_admin() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_member("jar1", "user1", JarRole::Admin)]])
            .append_query_results([[maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(1))
            }]])
            .into_connection();

        let service = service_with(db);
        let user = create_test_user("user1", "alice");
        let result = service.leave("jar1", &user).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<jar::Model>::new()])
            .into_connection();

        let service = service_with(db);
        let user = create_test_user("user1", "alice");
        let result = service.join("NOPE2345", &user).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
