//! HTTP API layer for the Decision Jar backend.
//!
//! This crate provides the JSON REST API:
//!
//! - **Endpoints**: auth, jars, ideas, voting, notifications
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: application state and auth resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
