//! # alumni-common
//!
//! Shared types, configuration, error handling, and the mentorship access rules
//! used across all Alumni Connect crates. No database or network access lives here.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod validation;
