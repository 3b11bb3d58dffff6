//! Participant data structure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a participant (unique within a room, used in match slots).
pub type ParticipantId = Uuid;

/// A participant connected to a room.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Avatar reference (URL or data URL), opaque to the core.
    pub avatar: String,
    pub is_admin: bool,
    /// Maintained by the gateway; the core only stores it.
    pub is_connected: bool,
}

impl Participant {
    /// Create a connected, non-admin participant.
    pub fn new(id: ParticipantId, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar: avatar.into(),
            is_admin: false,
            is_connected: true,
        }
    }

    /// Create the admin participant of a new room.
    pub fn admin(id: ParticipantId, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id, name, avatar)
        }
    }

    /// Refresh profile fields on reconnection.
    pub fn refresh(&mut self, name: impl Into<String>, avatar: impl Into<String>) {
        self.name = name.into();
        self.avatar = avatar.into();
        self.is_connected = true;
    }
}
