//! Repository abstraction for persisted event state.
//!
//! This module defines the `StateRepository` trait that abstracts storage
//! for the two persisted records: the participant collection and the event
//! configuration. Both are serialized as JSON text under fixed storage keys
//! and read/written wholesale; there are no partial updates at this layer.
//!
//! Reads are defensive: missing or malformed stored text yields an empty
//! collection or default configuration (logged at warn) rather than an
//! error. Only storage failures themselves surface as errors.

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use scratchmatch_core::{EventConfig, Participant};

/// Storage key for the participant collection.
///
/// Versioned key to prevent legacy data issues; carried over from the v2
/// stored layout so existing exports remain loadable.
pub const PARTICIPANTS_KEY: &str = "scratch_app_users_v2";

/// Storage key for the configuration record.
pub const CONFIG_KEY: &str = "scratch_app_config_v2";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage failure during {operation}: {message}")]
    Storage { operation: String, message: String },
}

impl RepositoryError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Repository trait for the persisted records.
///
/// Backends implement the three raw key-value operations; the typed
/// load/save methods are shared and handle encoding and defensive decoding.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Raw read of a storage key. Returns None when the key is absent.
    async fn read(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    /// Raw write of a storage key (upsert semantics).
    async fn write(&self, key: &str, value: String) -> Result<(), RepositoryError>;

    /// Remove a storage key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), RepositoryError>;

    /// Load the participant collection.
    ///
    /// Missing or malformed stored text yields an empty collection.
    async fn load_participants(&self) -> Result<Vec<Participant>, RepositoryError> {
        Ok(self
            .read(PARTICIPANTS_KEY)
            .await?
            .map(|text| decode_participants(&text))
            .unwrap_or_default())
    }

    /// Persist the whole participant collection.
    async fn save_participants(&self, participants: &[Participant]) -> Result<(), RepositoryError> {
        let text = serde_json::to_string(participants)
            .map_err(|e| RepositoryError::storage("encode participants", e.to_string()))?;
        self.write(PARTICIPANTS_KEY, text).await
    }

    /// Load the configuration record.
    ///
    /// Defaults are merged field-by-field over the stored values; a missing
    /// or malformed record yields full defaults.
    async fn load_config(&self) -> Result<EventConfig, RepositoryError> {
        Ok(self
            .read(CONFIG_KEY)
            .await?
            .map(|text| decode_config(&text))
            .unwrap_or_default())
    }

    /// Persist the configuration record.
    async fn save_config(&self, config: &EventConfig) -> Result<(), RepositoryError> {
        let text = serde_json::to_string(config)
            .map_err(|e| RepositoryError::storage("encode config", e.to_string()))?;
        self.write(CONFIG_KEY, text).await
    }

    /// Clear the participant collection.
    ///
    /// The configuration record is intentionally kept across resets.
    async fn reset(&self) -> Result<(), RepositoryError> {
        self.remove(PARTICIPANTS_KEY).await
    }
}

fn decode_participants(text: &str) -> Vec<Participant> {
    match serde_json::from_str(text) {
        Ok(participants) => participants,
        Err(e) => {
            warn!("Failed to parse stored participants, starting empty: {e}");
            Vec::new()
        }
    }
}

fn decode_config(text: &str) -> EventConfig {
    match serde_json::from_str(text) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse stored config, using defaults: {e}");
            EventConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_participants_malformed_yields_empty() {
        assert!(decode_participants("not json").is_empty());
        assert!(decode_participants("{\"this\": \"is not an array\"}").is_empty());
    }

    #[test]
    fn decode_participants_roundtrip() {
        let participants = vec![Participant::new("abc", "a@example.com")];
        let text = serde_json::to_string(&participants).unwrap();
        assert_eq!(decode_participants(&text), participants);
    }

    #[test]
    fn decode_config_malformed_yields_defaults() {
        assert_eq!(decode_config("###"), EventConfig::default());
    }

    #[test]
    fn decode_config_partial_merges_defaults() {
        let config = decode_config(r#"{"numberOfGroups": 5}"#);
        assert_eq!(config.number_of_groups, 5);
        assert_eq!(config.total_participants, 100);
    }

    #[tokio::test]
    async fn load_participants_empty_backend_yields_empty() {
        let repo = InMemoryRepository::new();
        let participants = repo.load_participants().await.unwrap();
        assert!(participants.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_participants() {
        let repo = InMemoryRepository::new();
        let participants = vec![
            Participant::new("a", "a@example.com"),
            Participant::new("b", "b@example.com"),
        ];

        repo.save_participants(&participants).await.unwrap();
        let loaded = repo.load_participants().await.unwrap();
        assert_eq!(loaded, participants);
    }

    #[tokio::test]
    async fn reset_clears_participants_but_keeps_config() {
        let repo = InMemoryRepository::new();
        let config = EventConfig {
            number_of_groups: 4,
            ..Default::default()
        };

        repo.save_participants(&[Participant::new("a", "a@example.com")])
            .await
            .unwrap();
        repo.save_config(&config).await.unwrap();

        repo.reset().await.unwrap();

        assert!(repo.load_participants().await.unwrap().is_empty());
        assert_eq!(repo.load_config().await.unwrap(), config);
    }

    #[tokio::test]
    async fn load_config_missing_yields_defaults() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.load_config().await.unwrap(), EventConfig::default());
    }
}
