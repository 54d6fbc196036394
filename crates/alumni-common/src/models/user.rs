//! User profile — the slice of the alumni network profile the mentorship core relies on.
//!
//! Accounts themselves are owned by the identity provider; this table mirrors
//! the role plus the mentoring settings and resume reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::AlumniError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Alumni,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Alumni => "alumni",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AlumniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "alumni" => Ok(Role::Alumni),
            "admin" => Ok(Role::Admin),
            other => Err(AlumniError::validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// A member of the alumni network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    /// One-line professional headline ("SRE @ Acme, class of 2015")
    pub headline: Option<String>,
    /// Storage reference of the student's current resume
    pub resume_url: Option<String>,
    /// Whether this alumni currently accepts mentorship requests
    pub mentoring_enabled: bool,
    /// Maximum concurrently accepted mentorships
    pub mentorship_capacity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public card shown next to a mentorship (the other party, or both for admins).
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCard {
    pub id: Uuid,
    pub name: String,
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

impl From<&User> for ProfileCard {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            headline: user.headline.clone(),
            resume_url: user.resume_url.clone(),
        }
    }
}

/// Alumni listing in the mentor directory.
#[derive(Debug, Clone, Serialize)]
pub struct MentorListing {
    pub id: Uuid,
    pub name: String,
    pub headline: Option<String>,
    pub mentorship_capacity: i64,
    pub available_slots: i64,
}

/// Update mentoring settings (alumni only).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMentoringRequest {
    pub mentoring_enabled: bool,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub mentorship_capacity: Option<i64>,
}
