//! Repository layer — query functions organized by domain.

pub mod mentorships;
pub mod users;
