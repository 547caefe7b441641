//! Single source of truth for event state.
//!
//! The `EventStore` holds the participant collection and the event
//! configuration in memory, loaded from a `StateRepository` at startup, and
//! writes through to the repository after each mutation. Persistence is
//! best-effort: a failed write is logged and the in-memory state kept, so
//! clients never see persistence errors.
//!
//! Every mutation bumps a watch-channel version; views subscribe instead of
//! polling the backing store (see the `sync` module).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use scratchmatch_core::{assign_group, upsert, EventConfig, EventConfigPatch, Participant};

use crate::repository::{InMemoryRepository, RepositoryError, StateRepository};

/// A domain operation that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("no participant with email {0}")]
    UnknownParticipant(String),
    #[error("participant has not completed registration")]
    NotRegistered,
    #[error("participant has not been approved")]
    NotApproved,
    #[error("the event is not open")]
    EventClosed,
}

pub struct EventStore {
    participants: RwLock<Vec<Participant>>,
    config: RwLock<EventConfig>,
    repository: Arc<dyn StateRepository>,
    /// Monotonically increasing state version; bumped on every mutation.
    version: watch::Sender<u64>,
}

impl EventStore {
    /// Load the store from a repository.
    ///
    /// Storage failures at startup are fatal; corrupt stored records are not
    /// (the repository decodes them defensively to empty/defaults).
    pub async fn load(repository: Arc<dyn StateRepository>) -> Result<Self, RepositoryError> {
        let participants = repository.load_participants().await?;
        let config = repository.load_config().await?;

        info!(
            "Loaded {} participants, {} groups configured, event {}",
            participants.len(),
            config.number_of_groups,
            if config.event_open { "open" } else { "closed" }
        );

        let (version, _) = watch::channel(0);
        Ok(Self {
            participants: RwLock::new(participants),
            config: RwLock::new(config),
            repository,
            version,
        })
    }

    /// Create a store backed by an in-memory repository (for testing).
    pub async fn in_memory() -> Self {
        Self::load(Arc::new(InMemoryRepository::new()))
            .await
            .expect("in-memory repository cannot fail to load")
    }

    /// Subscribe to state-version changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// The current state version.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    /// Persist the participant collection, swallowing failures.
    async fn persist_participants(&self, participants: &[Participant]) {
        if let Err(e) = self.repository.save_participants(participants).await {
            error!("Failed to persist participants: {e}");
        }
    }

    /// Persist the configuration record, swallowing failures.
    async fn persist_config(&self, config: &EventConfig) {
        if let Err(e) = self.repository.save_config(config).await {
            error!("Failed to persist config: {e}");
        }
    }

    // =========================================================================
    // Participant lifecycle
    // =========================================================================

    /// Sign a participant in by email.
    ///
    /// Returns the existing record, or creates a fresh one (all lifecycle
    /// flags false) on first sign-in.
    pub async fn sign_in(&self, email: &str) -> Participant {
        let mut participants = self.participants.write().await;

        if let Some(existing) = participants.iter().find(|p| p.email == email) {
            return existing.clone();
        }

        let participant = Participant::new(Uuid::new_v4().to_string(), email);
        info!("New participant signed in: {email}");
        participants.push(participant.clone());

        self.persist_participants(&participants).await;
        self.bump_version();
        participant
    }

    /// Record a participant's identity details and mark them registered.
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        department: &str,
    ) -> Result<Participant, EventError> {
        let mut participants = self.participants.write().await;

        let participant = participants
            .iter_mut()
            .find(|p| p.email == email)
            .ok_or_else(|| EventError::UnknownParticipant(email.to_string()))?;

        participant.full_name = Some(full_name.to_string());
        participant.department = Some(department.to_string());
        participant.registered = true;
        let updated = participant.clone();

        info!("Participant registered: {email}");
        self.persist_participants(&participants).await;
        self.bump_version();
        Ok(updated)
    }

    /// Approve a participant (admin action). Idempotent.
    pub async fn approve(&self, email: &str) -> Result<Participant, EventError> {
        let mut participants = self.participants.write().await;

        let participant = participants
            .iter_mut()
            .find(|p| p.email == email)
            .ok_or_else(|| EventError::UnknownParticipant(email.to_string()))?;

        participant.approved = true;
        let updated = participant.clone();

        info!("Participant approved: {email}");
        self.persist_participants(&participants).await;
        self.bump_version();
        Ok(updated)
    }

    /// Reveal a participant's group assignment.
    ///
    /// Requires a registered, approved participant and an open event. A
    /// repeat call returns the existing record unchanged: the assignment is
    /// set at most once and immutable afterwards.
    ///
    /// Counting already-assigned participants and writing the new assignment
    /// happen under one write lock, so two concurrent reveals cannot observe
    /// the same count and land in the same slot.
    pub async fn scratch(&self, email: &str) -> Result<Participant, EventError> {
        let mut participants = self.participants.write().await;
        let config = self.config.read().await.clone();

        let index = participants
            .iter()
            .position(|p| p.email == email)
            .ok_or_else(|| EventError::UnknownParticipant(email.to_string()))?;

        if participants[index].scratched {
            return Ok(participants[index].clone());
        }
        if !participants[index].registered {
            return Err(EventError::NotRegistered);
        }
        if !participants[index].approved {
            return Err(EventError::NotApproved);
        }
        if !config.event_open {
            return Err(EventError::EventClosed);
        }

        let scratched_count = participants.iter().filter(|p| p.scratched).count() as u64;
        let group = assign_group(scratched_count, config.number_of_groups);

        participants[index].scratched = true;
        participants[index].assigned_group = Some(group);
        let updated = participants[index].clone();

        info!("Participant {email} assigned to group {group}");
        self.persist_participants(&participants).await;
        self.bump_version();
        Ok(updated)
    }

    /// Merge an update into the collection by email (upsert semantics).
    ///
    /// Appends when no record with that email exists. Idempotent on
    /// identical input; an already-set assignment is preserved.
    pub async fn upsert_participant(&self, incoming: Participant) -> Participant {
        let mut participants = self.participants.write().await;
        let email = incoming.email.clone();

        upsert(&mut participants, incoming);
        let updated = participants
            .iter()
            .find(|p| p.email == email)
            .cloned()
            .expect("upsert guarantees the record exists");

        self.persist_participants(&participants).await;
        self.bump_version();
        updated
    }

    // =========================================================================
    // Admin operations
    // =========================================================================

    /// Apply a partial configuration update.
    pub async fn update_config(&self, patch: &EventConfigPatch) -> EventConfig {
        let mut config = self.config.write().await;
        config.apply(patch);
        let updated = config.clone();

        info!(
            "Config updated: total={} groups={} per_group={} open={}",
            updated.total_participants,
            updated.number_of_groups,
            updated.participants_per_group,
            updated.event_open
        );
        self.persist_config(&updated).await;
        self.bump_version();
        updated
    }

    /// Globally open or close the event.
    pub async fn set_event_open(&self, open: bool) -> EventConfig {
        let patch = EventConfigPatch {
            event_open: Some(open),
            ..Default::default()
        };
        self.update_config(&patch).await
    }

    /// Clear all participant records. Configuration is kept.
    pub async fn reset(&self) {
        let mut participants = self.participants.write().await;
        participants.clear();

        info!("Participant data reset");
        if let Err(e) = self.repository.reset().await {
            error!("Failed to reset persisted participants: {e}");
        }
        self.bump_version();
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub async fn participants(&self) -> Vec<Participant> {
        self.participants.read().await.clone()
    }

    pub async fn participant(&self, email: &str) -> Option<Participant> {
        let participants = self.participants.read().await;
        participants.iter().find(|p| p.email == email).cloned()
    }

    pub async fn config(&self) -> EventConfig {
        self.config.read().await.clone()
    }
}
