pub mod assignment;
pub mod config;
pub mod participant;

pub use assignment::assign_group;
pub use config::{EventConfig, EventConfigPatch};
pub use participant::{upsert, Participant};
