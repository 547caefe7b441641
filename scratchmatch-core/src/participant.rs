//! Participant records and collection upsert semantics.
//!
//! A participant is tracked by email from first sign-in through registration,
//! approval, and the final reveal. Records are never deleted individually;
//! the whole collection is cleared by an admin reset.
//!
//! Wire and stored field names are camelCase (`fullName`, `isRegistered`,
//! `assignedGroup`) to match the v2 stored layout.

use serde::{Deserialize, Serialize};

/// A registered event attendee, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, rename = "isRegistered")]
    pub registered: bool,
    #[serde(default, rename = "isApproved")]
    pub approved: bool,
    #[serde(default, rename = "isScratched")]
    pub scratched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_group: Option<u32>,
}

impl Participant {
    /// Create a fresh record as of first sign-in: no profile, all lifecycle
    /// flags false, no assignment.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            department: None,
            registered: false,
            approved: false,
            scratched: false,
            assigned_group: None,
        }
    }

    /// Overwrite this record with `incoming` field values.
    ///
    /// Identity is stable: `id` and `email` are kept from the existing record.
    /// Once an assignment has been revealed it is immutable, so a set
    /// `assigned_group` (and the `scratched` flag that accompanies it) wins
    /// over whatever the incoming record carries.
    pub fn merge_from(&mut self, incoming: &Participant) {
        self.full_name = incoming.full_name.clone();
        self.department = incoming.department.clone();
        self.registered = incoming.registered;
        self.approved = incoming.approved;
        if self.assigned_group.is_none() {
            self.scratched = incoming.scratched;
            self.assigned_group = incoming.assigned_group;
        }
    }
}

/// Merge `incoming` into the collection by email equality, appending if no
/// record with that email exists.
///
/// Applying the same update twice leaves the collection in the same state as
/// applying it once.
pub fn upsert(participants: &mut Vec<Participant>, incoming: Participant) {
    match participants.iter_mut().find(|p| p.email == incoming.email) {
        Some(existing) => existing.merge_from(&incoming),
        None => participants.push(incoming),
    }
}
