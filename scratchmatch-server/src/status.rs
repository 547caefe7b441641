//! Status types for the admin status endpoint.
//!
//! This module provides the view of event progress that the admin surface
//! and CLI render: lifecycle totals and per-group fill against capacity.

use serde::Serialize;

use scratchmatch_core::{EventConfig, Participant};

/// Summary statistics across the participant lifecycle.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total_participants: usize,
    pub registered: usize,
    pub approved: usize,
    pub scratched: usize,
}

/// Fill level of one group.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFill {
    pub group: u32,
    pub count: usize,
    pub capacity: u32,
    pub full: bool,
}

/// Full status data for rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    pub version: String,
    pub event_open: bool,
    pub config: EventConfig,
    pub summary: StatusSummary,
    pub groups: Vec<GroupFill>,
    pub participants: Vec<Participant>,
}

impl StatusData {
    /// Build status data from a store snapshot.
    pub fn from_snapshot(
        participants: Vec<Participant>,
        config: &EventConfig,
        version: String,
    ) -> Self {
        let summary = StatusSummary {
            total_participants: participants.len(),
            registered: participants.iter().filter(|p| p.registered).count(),
            approved: participants.iter().filter(|p| p.approved).count(),
            scratched: participants.iter().filter(|p| p.scratched).count(),
        };

        let groups = (1..=config.number_of_groups.max(1))
            .map(|group| {
                let count = participants
                    .iter()
                    .filter(|p| p.assigned_group == Some(group))
                    .count();
                GroupFill {
                    group,
                    count,
                    capacity: config.participants_per_group,
                    full: count >= config.participants_per_group as usize,
                }
            })
            .collect();

        Self {
            version,
            event_open: config.event_open,
            config: config.clone(),
            summary,
            groups,
            participants,
        }
    }
}
