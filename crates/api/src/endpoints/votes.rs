//! Voting endpoints.
//!
//! A single path carries the whole round lifecycle: `POST /jars/{id}/vote`
//! dispatches on the `action` field of the body, and `GET /jars/{id}/vote`
//! returns the current state, resolving an expired round first.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use jar_common::AppResult;
use jar_core::{ResolveOutcome, SessionResponse, StartVoteInput, VoteStateResponse};
use jar_db::entities::vote_session::TieBreakerMode;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState};

/// One action on a jar's vote round.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum VoteActionRequest {
    Start {
        tie_breaker_mode: Option<TieBreakerMode>,
        time_limit_minutes: Option<i64>,
        mandatory: Option<bool>,
    },
    Cast {
        idea_id: String,
    },
    Cancel,
    Extend,
    Resolve,
}

/// Vote action response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_round: Option<SessionResponse>,
}

impl VoteActionResponse {
    const fn success() -> Self {
        Self {
            success: true,
            session: None,
            winner_id: None,
            next_round: None,
        }
    }
}

/// Dispatch a vote action.
async fn vote_action(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Json(req): Json<VoteActionRequest>,
) -> AppResult<Json<VoteActionResponse>> {
    let response = match req {
        VoteActionRequest::Start {
            tie_breaker_mode,
            time_limit_minutes,
            mandatory,
        } => {
            let session = state
                .vote_service
                .start(
                    &jar_id,
                    &user,
                    StartVoteInput {
                        tie_breaker_mode,
                        time_limit_minutes,
                        mandatory,
                    },
                )
                .await?;
            VoteActionResponse {
                session: Some(session),
                ..VoteActionResponse::success()
            }
        }
        VoteActionRequest::Cast { idea_id } => {
            state.vote_service.cast(&jar_id, &user, &idea_id).await?;
            VoteActionResponse::success()
        }
        VoteActionRequest::Cancel => {
            state.vote_service.cancel(&jar_id, &user).await?;
            VoteActionResponse::success()
        }
        VoteActionRequest::Extend => {
            let session = state.vote_service.extend(&jar_id, &user).await?;
            VoteActionResponse {
                session: Some(session),
                ..VoteActionResponse::success()
            }
        }
        VoteActionRequest::Resolve => match state.vote_service.resolve(&jar_id, &user).await? {
            ResolveOutcome::NoVotes { .. } => VoteActionResponse::success(),
            ResolveOutcome::Winner { winner_id, .. } => VoteActionResponse {
                winner_id: Some(winner_id),
                ..VoteActionResponse::success()
            },
            ResolveOutcome::Runoff { next, .. } => VoteActionResponse {
                next_round: Some(SessionResponse::from_model(next)),
                ..VoteActionResponse::success()
            },
        },
    };

    Ok(Json(response))
}

/// Poll the jar's voting state.
async fn vote_state(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<Json<VoteStateResponse>> {
    let response = state.vote_service.state(&jar_id, &user).await?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/vote", get(vote_state).post(vote_action))
}
