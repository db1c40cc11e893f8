//! Snapshot persistence for community descriptions
//!
//! The engine itself never performs I/O; callers hand a store to
//! [`super::Community::persist`] and [`super::Community::restore`].

pub mod memory;
pub mod migrations;
pub mod sql_store;

pub use memory::MemoryDescriptionStore;
pub use migrations::{migrate, CURRENT_COMMUNITY_SCHEMA_VERSION};
pub use sql_store::SqliteDescriptionStore;

use super::errors::CommunityResult;
use super::types::{CommunityId, Description};

/// Storage backend for description snapshots.
///
/// Implementations must never replace a stored snapshot with one carrying a
/// lower clock.
pub trait DescriptionStore: Send + Sync {
    /// Save a snapshot. Returns `false` if a newer snapshot was already stored.
    fn save(&self, id: &CommunityId, description: &Description) -> CommunityResult<bool>;

    fn load(&self, id: &CommunityId) -> CommunityResult<Option<Description>>;

    /// Delete a snapshot. Returns `true` if one existed.
    fn delete(&self, id: &CommunityId) -> CommunityResult<bool>;
}
