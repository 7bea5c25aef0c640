//! Jar endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use jar_common::AppResult;
use jar_core::{CreateJarInput, JarMemberResponse, JarResponse, UpdateJarInput};
use jar_db::entities::jar_member::JarRole;
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create a jar. The caller becomes its first admin member.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJarInput>,
) -> AppResult<ApiResponse<JarResponse>> {
    let jar = state.jar_service.create(&user, input).await?;
    Ok(ApiResponse::ok(jar))
}

/// List jars the caller belongs to.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<JarResponse>>> {
    let jars = state.jar_service.list(&user).await?;
    Ok(ApiResponse::ok(jars))
}

/// Fetch a single jar.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<ApiResponse<JarResponse>> {
    let jar = state.jar_service.get(&jar_id, &user).await?;
    Ok(ApiResponse::ok(jar))
}

/// Update jar settings. Admin-only.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Json(input): Json<UpdateJarInput>,
) -> AppResult<ApiResponse<JarResponse>> {
    let jar = state.jar_service.update(&jar_id, &user, input).await?;
    Ok(ApiResponse::ok(jar))
}

/// Delete a jar. Admin-only.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.jar_service.delete(&jar_id, &user).await?;
    Ok(crate::response::ok())
}

/// Join request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub reference_code: String,
}

/// Join a jar by invite code.
async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> AppResult<ApiResponse<JarResponse>> {
    let jar = state.jar_service.join(&req.reference_code, &user).await?;
    Ok(ApiResponse::ok(jar))
}

/// Leave a jar.
async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<impl axum::response::IntoResponse> {
    state.jar_service.leave(&jar_id, &user).await?;
    Ok(crate::response::ok())
}

/// List jar members.
async fn members(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
) -> AppResult<ApiResponse<Vec<JarMemberResponse>>> {
    let members = state.jar_service.members(&jar_id, &user).await?;
    Ok(ApiResponse::ok(members))
}

/// Role update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub user_id: String,
    pub role: JarRole,
}

/// Change a member's role. Admin-only.
async fn update_role(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(jar_id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .jar_service
        .update_member_role(&jar_id, &user, &req.user_id, req.role)
        .await?;
    Ok(crate::response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/join", post(join))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/leave", post(leave))
        .route("/{id}/members", get(members))
        .route("/{id}/members/role", post(update_role))
}
