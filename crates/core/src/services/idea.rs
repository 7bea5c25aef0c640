//! Idea service: CRUD, moderation, and non-vote selection.

use chrono::Utc;
use jar_common::{AppError, AppResult, IdGenerator};
use jar_db::entities::idea::{self, IdeaStatus};
use jar_db::entities::jar::SelectionMode;
use jar_db::entities::notification::NotificationKind;
use jar_db::entities::user;
use jar_db::repositories::{IdeaRepository, JarRepository, UserRepository};
use rand::Rng;
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::notification::NotificationService;
use crate::services::user::XP_IDEA_ADDED;

/// Placeholder shown for surprise ideas until they are selected.
const SURPRISE_MASK: &str = "Surprise idea (revealed when selected)";

/// Input for adding an idea.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIdeaInput {
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    #[validate(length(max = 64))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 3))]
    pub cost_level: Option<i32>,
    #[validate(range(min = 1, max = 10_080))]
    pub time_minutes: Option<i32>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_surprise: bool,
}

/// Input for editing an idea.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIdeaInput {
    #[validate(length(min = 1, max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub category: Option<Option<String>>,
    #[validate(range(min = 1, max = 3))]
    pub cost_level: Option<Option<i32>>,
    #[validate(range(min = 1, max = 10_080))]
    pub time_minutes: Option<Option<i32>>,
    pub is_private: Option<bool>,
    pub is_surprise: Option<bool>,
}

/// Idea as returned by the API. Surprise descriptions are masked for
/// everyone but the author until the idea is selected.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    pub id: String,
    pub jar_id: String,
    pub created_by_id: String,
    pub description: String,
    pub category: Option<String>,
    pub cost_level: Option<i32>,
    pub time_minutes: Option<i32>,
    pub is_private: bool,
    pub is_surprise: bool,
    pub status: IdeaStatus,
    pub selected_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl IdeaResponse {
    #[must_use]
    pub fn for_viewer(model: idea::Model, viewer_id: &str) -> Self {
        let masked =
            model.is_surprise && model.selected_at.is_none() && model.created_by_id != viewer_id;
        Self {
            id: model.id,
            jar_id: model.jar_id,
            created_by_id: model.created_by_id,
            description: if masked {
                SURPRISE_MASK.to_string()
            } else {
                model.description
            },
            category: model.category,
            cost_level: model.cost_level,
            time_minutes: model.time_minutes,
            is_private: model.is_private,
            is_surprise: model.is_surprise,
            status: model.status,
            selected_at: model.selected_at.map(Into::into),
            created_at: model.created_at.into(),
        }
    }
}

/// Service for managing ideas.
#[derive(Clone)]
pub struct IdeaService {
    idea_repo: IdeaRepository,
    jar_repo: JarRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl IdeaService {
    /// Create a new idea service.
    #[must_use]
    pub const fn new(
        idea_repo: IdeaRepository,
        jar_repo: JarRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            idea_repo,
            jar_repo,
            user_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    async fn require_member(
        &self,
        jar_id: &str,
        user_id: &str,
    ) -> AppResult<jar_db::entities::jar_member::Model> {
        self.jar_repo
            .find_member(jar_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this jar".to_string()))
    }

    /// Add an idea to a jar. Members of moderated jars submit for
    /// approval; admin ideas are approved immediately.
    pub async fn add(
        &self,
        jar_id: &str,
        user: &user::Model,
        input: CreateIdeaInput,
    ) -> AppResult<IdeaResponse> {
        input.validate()?;
        let member = self.require_member(jar_id, &user.id).await?;
        let jar = self.jar_repo.get_by_id(jar_id).await?;

        let status = if jar.requires_approval && !member.role.is_admin() {
            IdeaStatus::Pending
        } else {
            IdeaStatus::Approved
        };

        let model = idea::ActiveModel {
            id: Set(self.id_gen.generate()),
            jar_id: Set(jar_id.to_string()),
            created_by_id: Set(user.id.clone()),
            description: Set(input.description),
            category: Set(input.category),
            cost_level: Set(input.cost_level),
            time_minutes: Set(input.time_minutes),
            is_private: Set(input.is_private),
            is_surprise: Set(input.is_surprise),
            status: Set(status),
            selected_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.idea_repo.create(model).await?;

        self.user_repo.add_xp(&user.id, XP_IDEA_ADDED).await?;

        // Private and surprise ideas stay quiet until selected
        if !created.is_private && !created.is_surprise {
            let author = user.display_name.clone().unwrap_or_else(|| user.username.clone());
            if let Err(e) = self
                .notifications
                .notify_jar_members(
                    jar_id,
                    Some(&user.id),
                    Some(&user.id),
                    NotificationKind::IdeaAdded,
                    format!("{author} added an idea to {}", jar.name),
                )
                .await
            {
                tracing::warn!(error = %e, jar_id, "Failed to fan out idea notification");
            }
        }

        Ok(IdeaResponse::for_viewer(created, &user.id))
    }

    /// List ideas in a jar. Other members' private ideas are omitted.
    pub async fn list(
        &self,
        jar_id: &str,
        user: &user::Model,
        include_selected: bool,
    ) -> AppResult<Vec<IdeaResponse>> {
        self.require_member(jar_id, &user.id).await?;

        let ideas = self.idea_repo.find_by_jar(jar_id, include_selected).await?;
        Ok(ideas
            .into_iter()
            .filter(|i| !i.is_private || i.created_by_id == user.id)
            .map(|i| IdeaResponse::for_viewer(i, &user.id))
            .collect())
    }

    /// Edit an idea. Author or jar admin; selected ideas are frozen.
    pub async fn update(
        &self,
        jar_id: &str,
        idea_id: &str,
        user: &user::Model,
        input: UpdateIdeaInput,
    ) -> AppResult<IdeaResponse> {
        input.validate()?;
        let idea = self.owned_or_admin(jar_id, idea_id, user).await?;

        if idea.selected_at.is_some() {
            return Err(AppError::BadRequest(
                "This idea has already been selected".to_string(),
            ));
        }

        let mut active: idea::ActiveModel = idea.into();
        active.description = input.description.map_or(NotSet, Set);
        active.category = input.category.map_or(NotSet, Set);
        active.cost_level = input.cost_level.map_or(NotSet, Set);
        active.time_minutes = input.time_minutes.map_or(NotSet, Set);
        active.is_private = input.is_private.map_or(NotSet, Set);
        active.is_surprise = input.is_surprise.map_or(NotSet, Set);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.idea_repo.update(active).await?;
        Ok(IdeaResponse::for_viewer(updated, &user.id))
    }

    /// Delete an idea. Author or jar admin.
    pub async fn delete(&self, jar_id: &str, idea_id: &str, user: &user::Model) -> AppResult<()> {
        let idea = self.owned_or_admin(jar_id, idea_id, user).await?;
        self.idea_repo.delete(&idea.id).await
    }

    /// Approve a pending idea. Admin-only.
    pub async fn approve(
        &self,
        jar_id: &str,
        idea_id: &str,
        user: &user::Model,
    ) -> AppResult<IdeaResponse> {
        let member = self.require_member(jar_id, &user.id).await?;
        if !member.role.is_admin() {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }

        let idea = self.idea_in_jar(jar_id, idea_id).await?;
        if idea.status == IdeaStatus::Approved {
            return Err(AppError::BadRequest("Idea is already approved".to_string()));
        }

        let mut active: idea::ActiveModel = idea.into();
        active.status = Set(IdeaStatus::Approved);
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.idea_repo.update(active).await?;
        Ok(IdeaResponse::for_viewer(updated, &user.id))
    }

    /// Draw a random idea from the candidate pool. Member action; the jar
    /// must be in random selection mode.
    pub async fn draw(&self, jar_id: &str, user: &user::Model) -> AppResult<IdeaResponse> {
        self.require_member(jar_id, &user.id).await?;
        let jar = self.jar_repo.get_by_id(jar_id).await?;

        if jar.selection_mode != SelectionMode::Random {
            return Err(AppError::BadRequest(
                "This jar is not in random selection mode".to_string(),
            ));
        }

        let candidates = self.idea_repo.find_candidates(jar_id).await?;
        if candidates.is_empty() {
            return Err(AppError::BadRequest("No ideas left in the jar".to_string()));
        }

        let index = rand::thread_rng().gen_range(0..candidates.len());
        let chosen = candidates
            .into_iter()
            .nth(index)
            .ok_or_else(|| AppError::Internal("Draw index out of range".to_string()))?;

        self.select(jar_id, chosen, &jar.name, &user.id).await
    }

    /// Pick a specific idea. Admin action; the jar must be in admin-pick
    /// selection mode.
    pub async fn pick(
        &self,
        jar_id: &str,
        idea_id: &str,
        user: &user::Model,
    ) -> AppResult<IdeaResponse> {
        let member = self.require_member(jar_id, &user.id).await?;
        if !member.role.is_admin() {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }
        let jar = self.jar_repo.get_by_id(jar_id).await?;

        if jar.selection_mode != SelectionMode::AdminPick {
            return Err(AppError::BadRequest(
                "This jar is not in admin-pick selection mode".to_string(),
            ));
        }

        let idea = self.idea_in_jar(jar_id, idea_id).await?;
        if !idea.is_candidate() {
            return Err(AppError::BadRequest(
                "This idea is not in the candidate pool".to_string(),
            ));
        }

        self.select(jar_id, idea, &jar.name, &user.id).await
    }

    /// Stamp an idea as selected, award XP, and notify the jar.
    async fn select(
        &self,
        jar_id: &str,
        idea: idea::Model,
        jar_name: &str,
        actor_id: &str,
    ) -> AppResult<IdeaResponse> {
        let author_id = idea.created_by_id.clone();
        let description = idea.description.clone();

        let mut active: idea::ActiveModel = idea.into();
        active.selected_at = Set(Some(Utc::now().into()));
        let selected = self.idea_repo.update(active).await?;

        self.user_repo
            .add_xp(&author_id, crate::services::user::XP_IDEA_SELECTED)
            .await?;

        if let Err(e) = self
            .notifications
            .notify_jar_members(
                jar_id,
                None,
                Some(actor_id),
                NotificationKind::IdeaSelected,
                format!("Selected from {jar_name}: {description}"),
            )
            .await
        {
            tracing::warn!(error = %e, jar_id, "Failed to fan out selection notification");
        }

        Ok(IdeaResponse::for_viewer(selected, actor_id))
    }

    async fn idea_in_jar(&self, jar_id: &str, idea_id: &str) -> AppResult<idea::Model> {
        let idea = self.idea_repo.get_by_id(idea_id).await?;
        if idea.jar_id != jar_id {
            return Err(AppError::NotFound(format!("Idea not found: {idea_id}")));
        }
        Ok(idea)
    }

    /// Fetch an idea the user may modify: the author, or any jar admin.
    async fn owned_or_admin(
        &self,
        jar_id: &str,
        idea_id: &str,
        user: &user::Model,
    ) -> AppResult<idea::Model> {
        let member = self.require_member(jar_id, &user.id).await?;
        let idea = self.idea_in_jar(jar_id, idea_id).await?;

        if idea.created_by_id != user.id && !member.role.is_admin() {
            return Err(AppError::Forbidden(
                "Only the author or a jar admin can modify this idea".to_string(),
            ));
        }
        Ok(idea)
    }
}
