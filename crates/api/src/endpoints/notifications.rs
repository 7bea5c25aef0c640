//! Notification endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use jar_common::AppResult;
use jar_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Notification list query.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_limit() -> u64 {
    50
}

/// Notification list response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<notification::Model>,
    pub unread: u64,
}

/// List the caller's notifications, newest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<NotificationListResponse>> {
    let notifications = state
        .notification_service
        .list(&user.id, query.limit.min(200))
        .await?;
    let unread = state.notification_service.unread_count(&user.id).await?;

    Ok(ApiResponse::ok(NotificationListResponse {
        notifications,
        unread,
    }))
}

/// Mark-read request. Without `ids`, everything is marked read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub ids: Option<Vec<String>>,
}

/// Mark-read response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Mark notifications read.
async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<ApiResponse<MarkReadResponse>> {
    let updated = state
        .notification_service
        .mark_read(&user.id, req.ids.as_deref())
        .await?;
    Ok(ApiResponse::ok(MarkReadResponse { updated }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/read", post(mark_read))
}
