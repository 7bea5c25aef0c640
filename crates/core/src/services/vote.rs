//! Vote service: voting rounds over a jar's candidate pool.
//!
//! A round moves `Active -> Completed` on resolution (including the
//! zero-vote case) or `Active -> Cancelled` on admin cancel. A tie under
//! the re-vote policy completes the round and opens a runoff restricted to
//! the tied ideas, with the tie-breaker forced to random-pick so a runoff
//! can never spawn another runoff.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use jar_common::config::VotingConfig;
use jar_common::{AppError, AppResult, IdGenerator};
use jar_db::entities::notification::NotificationKind;
use jar_db::entities::vote_session::{TieBreakerMode, VoteSessionStatus};
use jar_db::entities::{Idea, User, Vote, VoteSession};
use jar_db::entities::{idea, jar, jar_member, user, vote, vote_session};
use jar_db::repositories::{IdeaRepository, JarRepository, UserRepository, VoteRepository};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::services::notification::NotificationService;
use crate::services::user::{XP_IDEA_SELECTED, XP_VOTE_CAST};

/// Input for starting a vote round.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVoteInput {
    pub tie_breaker_mode: Option<TieBreakerMode>,
    pub time_limit_minutes: Option<i64>,
    /// Accepted on the wire but has no effect.
    #[serde(default)]
    pub mandatory: Option<bool>,
}

/// Vote session as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub jar_id: String,
    pub status: VoteSessionStatus,
    pub tie_breaker_mode: TieBreakerMode,
    pub round: i32,
    pub eligible_idea_ids: Option<Vec<String>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub winner_id: Option<String>,
    pub started_by_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SessionResponse {
    #[must_use]
    pub fn from_model(model: vote_session::Model) -> Self {
        let eligible_idea_ids = model.eligible_ids();
        Self {
            id: model.id,
            jar_id: model.jar_id,
            status: model.status,
            tie_breaker_mode: model.tie_breaker_mode,
            round: model.round,
            eligible_idea_ids,
            end_time: model.end_time.map(Into::into),
            winner_id: model.winner_id,
            started_by_id: model.started_by_id,
            created_at: model.created_at.into(),
            resolved_at: model.resolved_at.map(Into::into),
        }
    }
}

/// The most recent completed round, shown when no round is active.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastResult {
    pub session: SessionResponse,
    pub winner_description: Option<String>,
}

/// Current voting state of a jar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStateResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes_cast: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_members: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_voters: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<LastResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
}

/// What resolving a round produced.
#[derive(Debug)]
pub enum ResolveOutcome {
    /// Nobody voted; the round completed without a winner.
    NoVotes { session: vote_session::Model },
    /// A single idea won, outright or by random tie-break.
    Winner {
        session: vote_session::Model,
        winner_id: String,
    },
    /// A tie under the re-vote policy opened a runoff round.
    Runoff {
        completed: vote_session::Model,
        next: vote_session::Model,
    },
}

/// Tally ballots and return the idea ids sharing the maximum count,
/// sorted for determinism. Empty input yields an empty list.
#[must_use]
pub fn leading_ideas(votes: &[vote::Model]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for ballot in votes {
        *counts.entry(ballot.idea_id.as_str()).or_insert(0) += 1;
    }

    let Some(max) = counts.values().copied().max() else {
        return vec![];
    };

    let mut leaders: Vec<String> = counts
        .into_iter()
        .filter(|&(_, count)| count == max)
        .map(|(id, _)| id.to_string())
        .collect();
    leaders.sort();
    leaders
}

/// Service for vote rounds.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    jar_repo: JarRepository,
    idea_repo: IdeaRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    config: VotingConfig,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        jar_repo: JarRepository,
        idea_repo: IdeaRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        config: VotingConfig,
    ) -> Self {
        Self {
            vote_repo,
            jar_repo,
            idea_repo,
            user_repo,
            notifications,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    async fn require_member(&self, jar_id: &str, user_id: &str) -> AppResult<jar_member::Model> {
        self.jar_repo
            .find_member(jar_id, user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("You are not a member of this jar".to_string()))
    }

    async fn require_admin(&self, jar_id: &str, user_id: &str) -> AppResult<jar_member::Model> {
        let member = self.require_member(jar_id, user_id).await?;
        if !member.role.is_admin() {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }
        Ok(member)
    }

    /// Open a vote round. Admin-only; at most one active round per jar.
    pub async fn start(
        &self,
        jar_id: &str,
        user: &user::Model,
        input: StartVoteInput,
    ) -> AppResult<SessionResponse> {
        let jar = self.jar_repo.get_by_id(jar_id).await?;
        self.require_admin(jar_id, &user.id).await?;

        if let Some(minutes) = input.time_limit_minutes
            && !(1..=self.config.max_time_limit_minutes).contains(&minutes)
        {
            return Err(AppError::Validation(format!(
                "timeLimitMinutes must be between 1 and {}",
                self.config.max_time_limit_minutes
            )));
        }

        // Pre-check; the partial unique index closes the remaining race.
        if self.vote_repo.find_active_by_jar(jar_id).await?.is_some() {
            return Err(AppError::BadRequest(
                "A vote is already in progress for this jar".to_string(),
            ));
        }

        let end_time = input
            .time_limit_minutes
            .map(|minutes| (Utc::now() + Duration::minutes(minutes)).into());

        let model = vote_session::ActiveModel {
            id: Set(self.id_gen.generate()),
            jar_id: Set(jar_id.to_string()),
            status: Set(VoteSessionStatus::Active),
            tie_breaker_mode: Set(input.tie_breaker_mode.unwrap_or_default()),
            round: Set(1),
            eligible_idea_ids: Set(None),
            end_time: Set(end_time),
            winner_id: Set(None),
            started_by_id: Set(user.id.clone()),
            created_at: Set(Utc::now().into()),
            resolved_at: Set(None),
        };
        let session = self.vote_repo.create_session(model).await?;

        if let Err(e) = self
            .notifications
            .notify_jar_members(
                jar_id,
                Some(&user.id),
                Some(&user.id),
                NotificationKind::VoteStarted,
                format!("A vote has started in {}", jar.name),
            )
            .await
        {
            tracing::warn!(error = %e, jar_id, "Failed to fan out vote-start notification");
        }

        tracing::info!(jar_id, session_id = %session.id, "Vote round started");
        Ok(SessionResponse::from_model(session))
    }

    /// Record a member's ballot in the active round.
    pub async fn cast(&self, jar_id: &str, user: &user::Model, idea_id: &str) -> AppResult<()> {
        self.require_member(jar_id, &user.id).await?;

        let session = self
            .vote_repo
            .find_active_by_jar(jar_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No active vote session".to_string()))?;

        let now = Utc::now().into();
        if session.is_expired(&now) {
            return Err(AppError::BadRequest(
                "The voting window has closed".to_string(),
            ));
        }

        if self.vote_repo.has_voted(&session.id, &user.id).await? {
            return Err(AppError::BadRequest(
                "You have already voted in this round".to_string(),
            ));
        }

        if let Some(eligible) = session.eligible_ids()
            && !eligible.iter().any(|id| id == idea_id)
        {
            return Err(AppError::BadRequest(
                "This idea is not eligible in this round".to_string(),
            ));
        }

        let idea = self.idea_repo.get_by_id(idea_id).await?;
        if idea.jar_id != jar_id {
            return Err(AppError::NotFound(format!("Idea not found: {idea_id}")));
        }
        if idea.created_by_id == user.id {
            return Err(AppError::BadRequest(
                "You cannot vote for your own idea".to_string(),
            ));
        }

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            session_id: Set(session.id.clone()),
            user_id: Set(user.id.clone()),
            idea_id: Set(idea_id.to_string()),
            created_at: Set(Utc::now().into()),
        };
        self.vote_repo.create_vote(model).await?;

        self.user_repo.add_xp(&user.id, XP_VOTE_CAST).await?;

        tracing::debug!(jar_id, session_id = %session.id, "Ballot recorded");
        Ok(())
    }

    /// Resolve the active round. Admin action; the read path resolves
    /// expired rounds through [`Self::state`] instead.
    pub async fn resolve(&self, jar_id: &str, user: &user::Model) -> AppResult<ResolveOutcome> {
        let jar = self.jar_repo.get_by_id(jar_id).await?;
        self.require_admin(jar_id, &user.id).await?;
        self.resolve_active(&jar).await
    }

    /// Cancel the active round. Admin-only.
    pub async fn cancel(&self, jar_id: &str, user: &user::Model) -> AppResult<()> {
        let jar = self.jar_repo.get_by_id(jar_id).await?;
        self.require_admin(jar_id, &user.id).await?;

        let session = self
            .vote_repo
            .find_active_by_jar(jar_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No active vote session".to_string()))?;

        let mut active: vote_session::ActiveModel = session.into();
        active.status = Set(VoteSessionStatus::Cancelled);
        self.vote_repo.update_session(active).await?;

        if let Err(e) = self
            .notifications
            .notify_jar_members(
                jar_id,
                Some(&user.id),
                Some(&user.id),
                NotificationKind::VoteEnded,
                format!("The vote in {} was cancelled", jar.name),
            )
            .await
        {
            tracing::warn!(error = %e, jar_id, "Failed to fan out cancel notification");
        }

        tracing::info!(jar_id, "Vote round cancelled");
        Ok(())
    }

    /// Push the active round's deadline out by the configured extension.
    /// Admin-only; fails when the round has no deadline.
    pub async fn extend(&self, jar_id: &str, user: &user::Model) -> AppResult<SessionResponse> {
        self.jar_repo.get_by_id(jar_id).await?;
        self.require_admin(jar_id, &user.id).await?;

        let session = self
            .vote_repo
            .find_active_by_jar(jar_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No active vote session".to_string()))?;

        let Some(end_time) = session.end_time else {
            return Err(AppError::BadRequest(
                "This vote has no time limit to extend".to_string(),
            ));
        };

        let extended = end_time + Duration::minutes(self.config.extension_minutes);
        let mut active: vote_session::ActiveModel = session.into();
        active.end_time = Set(Some(extended));
        let updated = self.vote_repo.update_session(active).await?;

        Ok(SessionResponse::from_model(updated))
    }

    /// Current voting state for a member. An expired round is resolved
    /// here, on read, before the state is rendered; a round nobody reads
    /// stays active until someone next polls.
    pub async fn state(&self, jar_id: &str, user: &user::Model) -> AppResult<VoteStateResponse> {
        let jar = self.jar_repo.get_by_id(jar_id).await?;
        self.require_member(jar_id, &user.id).await?;

        let now = Utc::now().into();
        let mut active = self.vote_repo.find_active_by_jar(jar_id).await?;
        if let Some(session) = &active
            && session.is_expired(&now)
        {
            self.resolve_active(&jar).await?;
            // A re-vote tie-break may have opened a runoff round.
            active = self.vote_repo.find_active_by_jar(jar_id).await?;
        }

        if let Some(session) = active {
            return self.active_state(&jar, session, user).await;
        }

        let last = self.vote_repo.find_latest_completed(jar_id).await?;
        let (last_result, admin_name) = match last {
            Some(session) => {
                let winner_description = match &session.winner_id {
                    Some(id) => self
                        .idea_repo
                        .find_by_id(id)
                        .await?
                        .map(|i| i.description),
                    None => None,
                };
                let admin_name = self
                    .user_repo
                    .find_by_id(&session.started_by_id)
                    .await?
                    .map(|u| u.display_name.unwrap_or(u.username));
                (
                    Some(LastResult {
                        session: SessionResponse::from_model(session),
                        winner_description,
                    }),
                    admin_name,
                )
            }
            None => (None, None),
        };

        Ok(VoteStateResponse {
            active: false,
            session: None,
            has_voted: None,
            votes_cast: None,
            total_members: None,
            pending_voters: None,
            last_result,
            admin_name,
        })
    }

    async fn active_state(
        &self,
        jar: &jar::Model,
        session: vote_session::Model,
        user: &user::Model,
    ) -> AppResult<VoteStateResponse> {
        let votes = self.vote_repo.find_votes_by_session(&session.id).await?;
        let has_voted = votes.iter().any(|v| v.user_id == user.id);

        let members = self.jar_repo.find_members(&jar.id).await?;
        let voted: HashSet<&str> = votes.iter().map(|v| v.user_id.as_str()).collect();
        let pending_ids: Vec<String> = members
            .iter()
            .filter(|m| !voted.contains(m.user_id.as_str()))
            .map(|m| m.user_id.clone())
            .collect();
        let pending_voters = self
            .user_repo
            .find_by_ids(&pending_ids)
            .await?
            .into_iter()
            .map(|u| u.display_name.unwrap_or(u.username))
            .collect();

        Ok(VoteStateResponse {
            active: true,
            session: Some(SessionResponse::from_model(session)),
            has_voted: Some(has_voted),
            votes_cast: Some(votes.len() as u64),
            total_members: Some(members.len() as u64),
            pending_voters: Some(pending_voters),
            last_result: None,
            admin_name: None,
        })
    }

    /// Tally the active round and complete it. Runs in a transaction with
    /// the session row locked, so a concurrent resolve (admin action vs.
    /// the lazy read path) settles on one outcome.
    async fn resolve_active(&self, jar: &jar::Model) -> AppResult<ResolveOutcome> {
        let txn = self.vote_repo.db().begin().await.map_err(db_err)?;

        let session = VoteSession::find()
            .filter(vote_session::Column::JarId.eq(jar.id.as_str()))
            .filter(vote_session::Column::Status.eq(VoteSessionStatus::Active))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::NotFound("No active vote session".to_string()))?;

        let votes = Vote::find()
            .filter(vote::Column::SessionId.eq(session.id.as_str()))
            .all(&txn)
            .await
            .map_err(db_err)?;

        let leaders = leading_ideas(&votes);
        let outcome = match leaders.as_slice() {
            [] => {
                let completed = complete_session(&txn, session, None).await?;
                ResolveOutcome::NoVotes { session: completed }
            }
            [winner_id] => {
                let winner_id = winner_id.clone();
                let completed = crown_winner(&txn, session, &winner_id).await?;
                ResolveOutcome::Winner {
                    session: completed,
                    winner_id,
                }
            }
            tied => match session.tie_breaker_mode {
                TieBreakerMode::RandomPick => {
                    let winner_id = {
                        let mut rng = rand::thread_rng();
                        tied[rng.gen_range(0..tied.len())].clone()
                    };
                    let completed = crown_winner(&txn, session, &winner_id).await?;
                    ResolveOutcome::Winner {
                        session: completed,
                        winner_id,
                    }
                }
                TieBreakerMode::ReVote => {
                    let completed = complete_session(&txn, session, None).await?;
                    let next = vote_session::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        jar_id: Set(jar.id.clone()),
                        status: Set(VoteSessionStatus::Active),
                        // A runoff must not tie into another runoff
                        tie_breaker_mode: Set(TieBreakerMode::RandomPick),
                        round: Set(completed.round + 1),
                        eligible_idea_ids: Set(Some(serde_json::json!(tied))),
                        end_time: Set(None),
                        winner_id: Set(None),
                        started_by_id: Set(completed.started_by_id.clone()),
                        created_at: Set(Utc::now().into()),
                        resolved_at: Set(None),
                    }
                    .insert(&txn)
                    .await
                    .map_err(db_err)?;
                    ResolveOutcome::Runoff { completed, next }
                }
            },
        };

        txn.commit().await.map_err(db_err)?;

        self.notify_outcome(jar, &outcome).await;
        Ok(outcome)
    }

    async fn notify_outcome(&self, jar: &jar::Model, outcome: &ResolveOutcome) {
        let body = match outcome {
            ResolveOutcome::NoVotes { .. } => {
                format!("The vote in {} ended with no ballots cast", jar.name)
            }
            ResolveOutcome::Winner { winner_id, .. } => {
                let description = self
                    .idea_repo
                    .find_by_id(winner_id)
                    .await
                    .ok()
                    .flatten()
                    .map_or_else(|| "an idea".to_string(), |i| i.description);
                format!("The vote in {} picked: {description}", jar.name)
            }
            ResolveOutcome::Runoff { .. } => {
                format!("The vote in {} was tied; a runoff round has started", jar.name)
            }
        };

        if let Err(e) = self
            .notifications
            .notify_jar_members(&jar.id, None, None, NotificationKind::VoteEnded, body)
            .await
        {
            tracing::warn!(error = %e, jar_id = %jar.id, "Failed to fan out vote outcome");
        }
    }
}

fn db_err(e: DbErr) -> AppError {
    AppError::Database(e.to_string())
}

/// Mark a session completed with an optional winner.
async fn complete_session(
    txn: &DatabaseTransaction,
    session: vote_session::Model,
    winner_id: Option<String>,
) -> AppResult<vote_session::Model> {
    let mut active: vote_session::ActiveModel = session.into();
    active.status = Set(VoteSessionStatus::Completed);
    active.winner_id = Set(winner_id);
    active.resolved_at = Set(Some(Utc::now().into()));
    active.update(txn).await.map_err(db_err)
}

/// Complete a session with a winner, stamp the winning idea as selected,
/// and award XP to its author.
async fn crown_winner(
    txn: &DatabaseTransaction,
    session: vote_session::Model,
    winner_id: &str,
) -> AppResult<vote_session::Model> {
    let idea = Idea::find_by_id(winner_id)
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::NotFound(format!("Idea not found: {winner_id}")))?;

    let completed = complete_session(txn, session, Some(winner_id.to_string())).await?;

    let author_id = idea.created_by_id.clone();
    let mut active: idea::ActiveModel = idea.into();
    active.selected_at = Set(Some(Utc::now().into()));
    active.update(txn).await.map_err(db_err)?;

    User::update_many()
        .col_expr(
            user::Column::Xp,
            Expr::col(user::Column::Xp).add(XP_IDEA_SELECTED),
        )
        .filter(user::Column::Id.eq(author_id))
        .exec(txn)
        .await
        .map_err(db_err)?;

    Ok(completed)
}
