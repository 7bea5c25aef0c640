//! Idea endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use jar_common::AppResult;
use jar_core::{CreateIdeaInput, IdeaResponse, UpdateIdeaInput};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Add an idea to a jar.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Json(input): Json<CreateIdeaInput>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state.idea_service.add(&jar_id, &user, input).await?;
    Ok(ApiResponse::ok(idea))
}

/// Idea list query flags.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_selected: bool,
}

/// List ideas in a jar.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<IdeaResponse>>> {
    let ideas = state
        .idea_service
        .list(&jar_id, &user, query.include_selected)
        .await?;
    Ok(ApiResponse::ok(ideas))
}

/// Edit an idea. Author or jar admin.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((jar_id, idea_id)): Path<(String, String)>,
    Json(input): Json<UpdateIdeaInput>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state
        .idea_service
        .update(&jar_id, &idea_id, &user, input)
        .await?;
    Ok(ApiResponse::ok(idea))
}

/// Delete an idea. Author or jar admin.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((jar_id, idea_id)): Path<(String, String)>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.idea_service.delete(&jar_id, &idea_id, &user).await?;
    Ok(crate::response::ok())
}

/// Approve a pending idea. Admin-only.
async fn approve(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((jar_id, idea_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state.idea_service.approve(&jar_id, &idea_id, &user).await?;
    Ok(ApiResponse::ok(idea))
}

/// Draw a random idea from the candidate pool.
async fn draw(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state.idea_service.draw(&jar_id, &user).await?;
    Ok(ApiResponse::ok(idea))
}

/// Pick request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub idea_id: String,
}

/// Pick a specific idea. Admin-only.
async fn pick(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Json(req): Json<PickRequest>,
) -> AppResult<ApiResponse<IdeaResponse>> {
    let idea = state.idea_service.pick(&jar_id, &req.idea_id, &user).await?;
    Ok(ApiResponse::ok(idea))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/ideas", post(create).get(list))
        .route(
            "/{id}/ideas/{idea_id}",
            axum::routing::patch(update).delete(delete),
        )
        .route("/{id}/ideas/{idea_id}/approve", post(approve))
        .route("/{id}/draw", post(draw))
        .route("/{id}/pick", post(pick))
}
