//! User profile endpoints.

use axum::{Json, Router, extract::State, routing::get};
use jar_common::AppResult;
use jar_core::{UpdateProfileInput, UserResponse};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Get the caller's profile, including XP and derived level.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse::from_model(user))
}

/// Update the caller's profile settings.
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_profile(user, input).await?;
    Ok(ApiResponse::ok(UserResponse::from_model(updated)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(me).patch(update_me))
}
