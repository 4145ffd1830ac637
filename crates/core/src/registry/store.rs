use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key-value storage of named slots, each holding one serialized value.
pub trait SlotStore: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot was never written or was removed.
    fn load(&self, slot: &str) -> Result<Option<String>, RegistryError>;

    /// Write a slot, replacing any previous value.
    fn save(&self, slot: &str, value: &str) -> Result<(), RegistryError>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn remove(&self, slot: &str) -> Result<(), RegistryError>;
}
