//! API endpoints.

mod auth;
mod ideas;
mod jars;
mod notifications;
mod users;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .nest("/users", users::router())
        .nest(
            "/jars",
            jars::router().merge(ideas::router()).merge(votes::router()),
        )
        .nest("/notifications", notifications::router())
}
