//! In-memory fleet registry
//!
//! This module handles:
//! - Registering robots and allocating their identifiers
//! - Listing, fetching and deleting robots
//! - Serialized read-modify-write of a single robot's snapshot

mod fleet;

pub use fleet::{FleetRegistry, RegistryError};
