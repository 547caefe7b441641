pub mod admin;
pub mod api;
pub mod config;
pub mod repository;
pub mod status;
pub mod store;
pub mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::AdminCredentials;
use crate::store::EventStore;

pub fn service_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct AppState {
    pub store: Arc<EventStore>,
    /// Admin credential pair. None disables the admin surface entirely.
    pub admin_credentials: Option<AdminCredentials>,
    /// Active admin session tokens with their expiry times.
    pub sessions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl AppState {
    pub fn new(store: Arc<EventStore>, admin_credentials: Option<AdminCredentials>) -> Self {
        Self {
            store,
            admin_credentials,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}
