use super::KeyStore;
use crate::error::JoseResult;
use crate::key_type::{KeyKind, KeyMaterial};
use dashmap::DashMap;

/// Process-local key store
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: DashMap<(String, KeyKind), KeyMaterial>,
}

impl MemoryKeyStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, name: &str, kind: KeyKind) -> Option<KeyMaterial> {
        self.keys
            .get(&(name.to_string(), kind))
            .map(|entry| entry.value().clone())
    }

    fn set(&self, name: &str, key: KeyMaterial) -> JoseResult<()> {
        self.keys.insert((name.to_string(), key.kind()), key);
        Ok(())
    }

    fn clear(&self, name: &str, kind: KeyKind) -> JoseResult<()> {
        self.keys.remove(&(name.to_string(), kind));
        Ok(())
    }
}
