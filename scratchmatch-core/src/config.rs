//! Event configuration and partial updates.

use serde::{Deserialize, Serialize};

/// Singleton event configuration.
///
/// Mutated only by admin actions, and intentionally left untouched by a
/// participant reset. Every field carries a default so that a stored record
/// missing some fields (or missing entirely) loads with defaults merged in
/// for exactly the absent fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventConfig {
    pub total_participants: u32,
    pub number_of_groups: u32,
    pub participants_per_group: u32,
    pub event_open: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            total_participants: 100,
            number_of_groups: 10,
            participants_per_group: 10,
            event_open: false,
        }
    }
}

/// Partial configuration update: only the fields present are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventConfigPatch {
    pub total_participants: Option<u32>,
    pub number_of_groups: Option<u32>,
    pub participants_per_group: Option<u32>,
    pub event_open: Option<bool>,
}

impl EventConfig {
    /// Apply a partial update field by field.
    pub fn apply(&mut self, patch: &EventConfigPatch) {
        if let Some(total) = patch.total_participants {
            self.total_participants = total;
        }
        if let Some(groups) = patch.number_of_groups {
            self.number_of_groups = groups;
        }
        if let Some(per_group) = patch.participants_per_group {
            self.participants_per_group = per_group;
        }
        if let Some(open) = patch.event_open {
            self.event_open = open;
        }
    }
}
