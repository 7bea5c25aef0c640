//! API integration tests.
//!
//! These tests drive the router end to end over mock database
//! connections.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use jar_api::{middleware::AppState, middleware::auth_middleware, router as api_router};
use jar_common::config::VotingConfig;
use jar_core::{IdeaService, JarService, NotificationService, UserService, VoteService};
use jar_db::entities::jar_member::{self, JarRole};
use jar_db::entities::{jar, user};
use jar_db::repositories::{
    IdeaRepository, JarRepository, NotificationRepository, UserRepository, VoteRepository,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use std::sync::Arc;
use tower::ServiceExt;

fn empty_mock() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn create_test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        password_hash: "$argon2id$stub".to_string(),
        token: Some("token123".to_string()),
        display_name: None,
        xp: 0,
        notify_votes: true,
        notify_ideas: true,
        created_at: Utc::now().into(),
    }
}

fn create_test_jar(id: &str) -> jar::Model {
    jar::Model {
        id: id.to_string(),
        owner_id: "user1".to_string(),
        name: "Date Night".to_string(),
        description: None,
        topic: None,
        reference_code: "ABCD2345".to_string(),
        selection_mode: jar::SelectionMode::Vote,
        requires_approval: false,
        members_count: 1,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

/// Build an app over the given mock connections.
fn create_test_app(
    user_db: DatabaseConnection,
    jar_db: DatabaseConnection,
    idea_db: DatabaseConnection,
    vote_db: DatabaseConnection,
    notification_db: DatabaseConnection,
) -> Router {
    let user_repo = UserRepository::new(Arc::new(user_db));
    let jar_repo = JarRepository::new(Arc::new(jar_db));
    let idea_repo = IdeaRepository::new(Arc::new(idea_db));
    let vote_repo = VoteRepository::new(Arc::new(vote_db));
    let notification_repo = NotificationRepository::new(Arc::new(notification_db));

    let notification_service = NotificationService::new(
        notification_repo,
        jar_repo.clone(),
        user_repo.clone(),
    );
    let user_service = UserService::new(user_repo.clone());
    let jar_service = JarService::new(
        jar_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let idea_service = IdeaService::new(
        idea_repo.clone(),
        jar_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let vote_service = VoteService::new(
        vote_repo,
        jar_repo,
        idea_repo,
        user_repo,
        notification_service.clone(),
        VotingConfig::default(),
    );

    let state = AppState {
        user_service,
        jar_service,
        idea_service,
        vote_service,
        notification_service,
    };

    api_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

#[tokio::test]
async fn test_me_requires_auth() {
    let app = create_test_app(empty_mock(), empty_mock(), empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vote_action_requires_auth() {
    let app = create_test_app(empty_mock(), empty_mock(), empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jars/jar1/vote")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"action":"CAST","ideaId":"idea1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let user_db = MockDatabase::new(DatabaseBackend::Postgres)
        // auth middleware token lookup
        .append_query_results([[create_test_user("user1", "alice")]])
        .into_connection();

    let app = create_test_app(user_db, empty_mock(), empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users/me")
                .method("GET")
                .header("Authorization", "Bearer token123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["username"], "alice");
    assert_eq!(json["data"]["level"], 1);
}

#[tokio::test]
async fn test_signup_returns_token() {
    let created = create_test_user("user1", "alice");

    let user_db = MockDatabase::new(DatabaseBackend::Postgres)
        // username availability check, then the insert
        .append_query_results([Vec::<user::Model>::new()])
        .append_query_results([[created]])
        .into_connection();

    let app = create_test_app(user_db, empty_mock(), empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/signup")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"username":"alice","password":"password123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["token"], "token123");
}

#[tokio::test]
async fn test_vote_state_rejects_non_member() {
    let user_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("user9", "mallory")]])
        .into_connection();
    let jar_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_jar("jar1")]])
        .append_query_results([Vec::<jar_member::Model>::new()])
        .into_connection();

    let app = create_test_app(user_db, jar_db, empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jars/jar1/vote")
                .method("GET")
                .header("Authorization", "Bearer token123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_vote_start_rejects_plain_member() {
    let user_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("user2", "bob")]])
        .into_connection();
    let jar_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_jar("jar1")]])
        .append_query_results([[jar_member::Model {
            id: "m-user2".to_string(),
            jar_id: "jar1".to_string(),
            user_id: "user2".to_string(),
            role: JarRole::Member,
            joined_at: Utc::now().into(),
        }]])
        .into_connection();

    let app = create_test_app(user_db, jar_db, empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jars/jar1/vote")
                .method("POST")
                .header("Authorization", "Bearer token123")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"action":"START"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_jar_returns_not_found() {
    let user_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_test_user("user1", "alice")]])
        .into_connection();
    let jar_db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<jar_member::Model>::new()])
        .into_connection();

    let app = create_test_app(user_db, jar_db, empty_mock(), empty_mock(), empty_mock());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/jars/missing")
                .method("GET")
                .header("Authorization", "Bearer token123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Membership is checked before the jar itself is loaded
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
