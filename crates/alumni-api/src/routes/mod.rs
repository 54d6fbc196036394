//! API route modules.

pub mod events;
pub mod health;
pub mod mentorships;
pub mod messages;
pub mod uploads;
pub mod users;
