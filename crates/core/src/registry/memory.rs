use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{RegistryError, SlotStore};

/// Non-durable slot store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlotStore {
    fn load(&self, slot: &str) -> Result<Option<String>, RegistryError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(slot).cloned())
    }

    fn save(&self, slot: &str, value: &str) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), RegistryError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_remove() {
        let store = MemorySlotStore::new();
        assert_eq!(store.load("a").unwrap(), None);

        store.save("a", "1").unwrap();
        store.save("a", "2").unwrap();
        assert_eq!(store.load("a").unwrap(), Some("2".to_string()));

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
    }
}
