//! In-memory description store

use super::DescriptionStore;
use crate::core_community::errors::CommunityResult;
use crate::core_community::types::{CommunityId, Description};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Description store backed by a map; contents are lost on drop
#[derive(Debug, Default)]
pub struct MemoryDescriptionStore {
    snapshots: RwLock<HashMap<CommunityId, Description>>,
}

impl MemoryDescriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DescriptionStore for MemoryDescriptionStore {
    fn save(&self, id: &CommunityId, description: &Description) -> CommunityResult<bool> {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = snapshots.get(id) {
            if existing.clock > description.clock {
                return Ok(false);
            }
        }

        snapshots.insert(*id, description.clone());
        Ok(true)
    }

    fn load(&self, id: &CommunityId) -> CommunityResult<Option<Description>> {
        let snapshots = self.snapshots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots.get(id).cloned())
    }

    fn delete(&self, id: &CommunityId) -> CommunityResult<bool> {
        let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(clock: u64) -> Description {
        Description {
            clock,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryDescriptionStore::new();
        let id = CommunityId::from_bytes([1u8; 32]);

        assert!(store.load(&id).unwrap().is_none());
        assert!(store.save(&id, &description(3)).unwrap());
        assert_eq!(store.load(&id).unwrap().unwrap().clock, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_older_snapshot_is_ignored() {
        let store = MemoryDescriptionStore::new();
        let id = CommunityId::from_bytes([1u8; 32]);

        store.save(&id, &description(5)).unwrap();
        assert!(!store.save(&id, &description(4)).unwrap());
        assert_eq!(store.load(&id).unwrap().unwrap().clock, 5);
    }

    #[test]
    fn test_delete() {
        let store = MemoryDescriptionStore::new();
        let id = CommunityId::from_bytes([1u8; 32]);

        store.save(&id, &description(1)).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.is_empty());
    }
}
