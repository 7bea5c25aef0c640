//! User service: accounts, authentication, and experience points.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jar_common::{AppError, AppResult, IdGenerator};
use jar_db::{entities::user, repositories::UserRepository};
use sea_orm::{ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// XP awarded for suggesting an idea.
pub const XP_IDEA_ADDED: i64 = 10;

/// XP awarded for casting a ballot.
pub const XP_VOTE_CAST: i64 = 5;

/// XP awarded to an idea's author when it is selected.
pub const XP_IDEA_SELECTED: i64 = 25;

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 128))]
    pub display_name: Option<String>,
}

/// Input for updating profile settings.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 128))]
    pub display_name: Option<Option<String>>,
    pub notify_votes: Option<bool>,
    pub notify_ideas: Option<bool>,
}

/// User profile as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub notify_votes: bool,
    pub notify_ideas: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl UserResponse {
    #[must_use]
    pub fn from_model(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            display_name: model.display_name,
            xp: model.xp,
            level: level_for_xp(model.xp),
            notify_votes: model.notify_votes,
            notify_ideas: model.notify_ideas,
            created_at: model.created_at.into(),
        }
    }
}

/// Level derived from accumulated XP: level n starts at `100 * (n - 1)^2`.
#[must_use]
pub fn level_for_xp(xp: i64) -> i32 {
    let xp = xp.max(0) as f64;
    (xp / 100.0).sqrt() as i32 + 1
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account and mint its access token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Username is already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            password_hash: Set(password_hash),
            token: Set(Some(self.id_gen.generate_token())),
            display_name: Set(input.display_name),
            xp: Set(0),
            notify_votes: Set(true),
            notify_ideas: Set(true),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }

    /// Authenticate by username and password, minting a token if the
    /// account has none.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.token.is_some() {
            return Ok(user);
        }

        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(self.id_gen.generate_token()));
        self.user_repo.update(active).await
    }

    /// Authenticate a user by access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Update profile settings.
    pub async fn update_profile(
        &self,
        user: user::Model,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let mut active: user::ActiveModel = user.into();
        active.display_name = input.display_name.map_or(NotSet, Set);
        active.notify_votes = input.notify_votes.map_or(NotSet, Set);
        active.notify_ideas = input.notify_ideas.map_or(NotSet, Set);

        self.user_repo.update(active).await
    }

    /// Award experience points.
    pub async fn award_xp(&self, user_id: &str, amount: i64) -> AppResult<()> {
        self.user_repo.add_xp(user_id, amount).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
