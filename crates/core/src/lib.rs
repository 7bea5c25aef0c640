//! Core business logic for the Decision Jar backend.

pub mod services;

pub use services::*;
