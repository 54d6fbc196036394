//! Core domain models shared across all Alumni Connect crates.
//!
//! These are the "truth" types — what the store persists and the API serializes.
//! Identifiers are UUID v7 so they sort by creation time.

pub mod mentorship;
pub mod message;
pub mod user;

/// Re-export all model types for convenience.
pub use mentorship::*;
pub use message::*;
pub use user::*;
