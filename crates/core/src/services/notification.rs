//! Notification service: in-app notifications and jar-wide fan-out.

use chrono::Utc;
use jar_common::{AppResult, IdGenerator};
use jar_db::{
    entities::notification::{self, NotificationKind},
    entities::user,
    repositories::{JarRepository, NotificationRepository, UserRepository},
};
use sea_orm::Set;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    jar_repo: JarRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        jar_repo: JarRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            notification_repo,
            jar_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a single notification.
    pub async fn create(
        &self,
        user_id: &str,
        kind: NotificationKind,
        jar_id: Option<&str>,
        actor_id: Option<&str>,
        body: String,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind),
            jar_id: Set(jar_id.map(ToString::to_string)),
            actor_id: Set(actor_id.map(ToString::to_string)),
            body: Set(body),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };
        self.notification_repo.create(model).await
    }

    /// Fan a notification out to every member of a jar, honoring per-user
    /// preference flags. Returns the number of notifications created.
    pub async fn notify_jar_members(
        &self,
        jar_id: &str,
        exclude_user_id: Option<&str>,
        actor_id: Option<&str>,
        kind: NotificationKind,
        body: String,
    ) -> AppResult<usize> {
        let memberships = self.jar_repo.find_members(jar_id).await?;
        let user_ids: Vec<String> = memberships.into_iter().map(|m| m.user_id).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        let mut created = 0;
        for user in users {
            if exclude_user_id == Some(user.id.as_str()) {
                continue;
            }
            if !preference_allows(&user, kind) {
                continue;
            }
            self.create(&user.id, kind, Some(jar_id), actor_id, body.clone())
                .await?;
            created += 1;
        }

        tracing::debug!(jar_id, count = created, "Fanned out jar notification");
        Ok(created)
    }

    /// List a user's notifications, newest first.
    pub async fn list(&self, user_id: &str, limit: u64) -> AppResult<Vec<notification::Model>> {
        self.notification_repo.find_by_user(user_id, limit).await
    }

    /// Count unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark the given notifications read, or all when `ids` is `None`.
    pub async fn mark_read(&self, user_id: &str, ids: Option<&[String]>) -> AppResult<u64> {
        self.notification_repo.mark_read(user_id, ids).await
    }
}

/// Whether a user's preference flags allow a notification kind.
fn preference_allows(user: &user::Model, kind: NotificationKind) -> bool {
    match kind {
        NotificationKind::VoteStarted | NotificationKind::VoteEnded => user.notify_votes,
        NotificationKind::IdeaAdded
        | NotificationKind::IdeaSelected
        | NotificationKind::MemberJoined => user.notify_ideas,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use jar_db::entities::jar_member::{self, JarRole};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, notify_votes: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user-{id}"),
            username_lower: format!("user-{id}"),
            password_hash: "$argon2id$stub".to_string(),
            token: None,
            display_name: None,
            xp: 0,
            notify_votes,
            notify_ideas: true,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_member(jar_id: &str, user_id: &str) -> jar_member::Model {
        jar_member::Model {
            id: format!("m-{user_id}"),
            jar_id: jar_id.to_string(),
            user_id: user_id.to_string(),
            role: JarRole::Member,
            joined_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_preference_allows() {
        let muted = create_test_user("user1", false);
        let open = create_test_user("user2", true);

        assert!(!preference_allows(&muted, NotificationKind::VoteStarted));
        assert!(preference_allows(&open, NotificationKind::VoteStarted));
        // Idea notifications follow their own flag
        assert!(preference_allows(&muted, NotificationKind::IdeaAdded));
    }

    #[tokio::test]
    async fn test_notify_jar_members_skips_excluded_and_muted() {
        let notification_db = MockDatabase::new(DatabaseBackend::Postgres)
            // Only user3 both remains and allows vote notifications
            .append_query_results([[notification::Model {
                id: "n1".to_string(),
                user_id: "user3".to_string(),
                kind: NotificationKind::VoteStarted,
                jar_id: Some("jar1".to_string()),
                actor_id: Some("user1".to_string()),
                body: "A vote has started".to_string(),
                is_read: false,
                created_at: Utc::now().into(),
            }]])
            .into_connection();
        let jar_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_member("jar1", "user1"),
                create_test_member("jar1", "user2"),
                create_test_member("jar1", "user3"),
            ]])
            .into_connection();
        let user_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_user("user1", true),
                create_test_user("user2", false),
                create_test_user("user3", true),
            ]])
            .into_connection();

        let service = NotificationService::new(
            NotificationRepository::new(Arc::new(notification_db)),
            JarRepository::new(Arc::new(jar_db)),
            UserRepository::new(Arc::new(user_db)),
        );

        let created = service
            .notify_jar_members(
                "jar1",
                Some("user1"),
                Some("user1"),
                NotificationKind::VoteStarted,
                "A vote has started".to_string(),
            )
            .await
            .unwrap();

        assert_eq!(created, 1);
    }
}
