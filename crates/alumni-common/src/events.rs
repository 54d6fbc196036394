//! Mentorship events — published by the API after a successful mutation.
//!
//! The API pushes these onto an in-process broadcast channel; the `/events`
//! stream forwards each one to the users listed in `recipients`. Delivery is
//! best effort: a send with no subscribers is simply dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MENTORSHIP_REQUEST: &str = "MENTORSHIP_REQUEST";
pub const MENTORSHIP_STATUS: &str = "MENTORSHIP_STATUS";
pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
pub const MESSAGE_DELETE: &str = "MESSAGE_DELETE";
pub const MESSAGES_READ: &str = "MESSAGES_READ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorshipEvent {
    /// One of the event name constants in this module
    pub event_type: String,
    pub mentorship_id: Uuid,
    /// User whose action produced the event
    pub actor_id: Uuid,
    /// Users the event is delivered to
    pub recipients: Vec<Uuid>,
    pub data: serde_json::Value,
}

impl MentorshipEvent {
    pub fn is_for(&self, user_id: Uuid) -> bool {
        self.recipients.contains(&user_id)
    }
}
