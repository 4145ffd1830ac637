//! Artifact registry bound to one persisted slot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::artifact::ArtifactRef;

use super::{RegistryError, SlotStore};

/// The set of artifacts produced by the last run, persisted in a named slot.
pub struct ArtifactRegistry {
    slot: String,
    store: Arc<dyn SlotStore>,
    current: RwLock<Arc<Vec<ArtifactRef>>>,
}

impl ArtifactRegistry {
    /// Open the registry, loading whatever the slot holds.
    ///
    /// A missing, unreadable or undecodable slot yields an empty registry.
    pub fn open(store: Arc<dyn SlotStore>, slot: impl Into<String>) -> Self {
        let slot = slot.into();

        let loaded = match store.load(&slot) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ArtifactRef>>(&raw) {
                Ok(items) => {
                    info!("Loaded {} artifacts from slot {}", items.len(), slot);
                    items
                }
                Err(e) => {
                    warn!("Discarding undecodable slot {}: {}", slot, e);
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("Slot {} is empty", slot);
                Vec::new()
            }
            Err(e) => {
                warn!("Failed to read slot {}, starting empty: {}", slot, e);
                Vec::new()
            }
        };

        Self {
            slot,
            store,
            current: RwLock::new(Arc::new(loaded)),
        }
    }

    /// Replace the whole set. Persisted before the new set becomes visible.
    ///
    /// Artifacts sharing an id collapse to the last one, at the position of the first.
    pub fn put(&self, items: Vec<ArtifactRef>) -> Result<(), RegistryError> {
        let items = dedupe_by_id(items);
        let raw =
            serde_json::to_string(&items).map_err(|e| RegistryError::Serialization(e.to_string()))?;

        // Held across the save so the slot and the visible set change together.
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.store.save(&self.slot, &raw)?;

        debug!("Stored {} artifacts in slot {}", items.len(), self.slot);
        *current = Arc::new(items);
        Ok(())
    }

    /// Current set (empty if none).
    pub fn get(&self) -> Vec<ArtifactRef> {
        self.snapshot().as_ref().clone()
    }

    /// Shared handle on the current set, without copying it.
    pub fn snapshot(&self) -> Arc<Vec<ArtifactRef>> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Look up a single artifact by id.
    pub fn find(&self, id: &str) -> Option<ArtifactRef> {
        self.snapshot().iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Empty the set and drop the persisted slot.
    pub fn clear(&self) -> Result<(), RegistryError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(&self.slot)?;
        *current = Arc::new(Vec::new());
        info!("Cleared slot {}", self.slot);
        Ok(())
    }
}

fn dedupe_by_id(items: Vec<ArtifactRef>) -> Vec<ArtifactRef> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<ArtifactRef> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(&item.id) {
            Some(&idx) => out[idx] = item,
            None => {
                positions.insert(item.id.clone(), out.len());
                out.push(item);
            }
        }
    }

    out
}
