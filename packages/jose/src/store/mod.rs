//! Named key storage and the suppliers that read from it

mod file;
mod memory;

pub use file::FileKeyStore;
pub use memory::MemoryKeyStore;

use crate::document::{Document, DocumentExt};
use crate::error::JoseResult;
use crate::key_type::{KeyKind, KeyMaterial};
use crate::supplier::KeySupplier;
use std::sync::Arc;

/// Key storage keyed by name and kind
pub trait KeyStore: Send + Sync {
    /// Key stored under `name` with `kind`
    fn get(&self, name: &str, kind: KeyKind) -> Option<KeyMaterial>;

    /// Store `key` under `name`; its kind comes from the material
    fn set(&self, name: &str, key: KeyMaterial) -> JoseResult<()>;

    /// Remove the key stored under `name` with `kind`
    fn clear(&self, name: &str, kind: KeyKind) -> JoseResult<()>;

    /// Supplier resolving keys by the header's `kid`
    fn supplier(&self) -> StoreSupplier<&Self>
    where
        Self: Sized,
    {
        StoreSupplier::new(self)
    }
}

impl<S: KeyStore + ?Sized> KeyStore for &S {
    fn get(&self, name: &str, kind: KeyKind) -> Option<KeyMaterial> {
        (**self).get(name, kind)
    }

    fn set(&self, name: &str, key: KeyMaterial) -> JoseResult<()> {
        (**self).set(name, key)
    }

    fn clear(&self, name: &str, kind: KeyKind) -> JoseResult<()> {
        (**self).clear(name, kind)
    }
}

impl<S: KeyStore + ?Sized> KeyStore for Arc<S> {
    fn get(&self, name: &str, kind: KeyKind) -> Option<KeyMaterial> {
        (**self).get(name, kind)
    }

    fn set(&self, name: &str, key: KeyMaterial) -> JoseResult<()> {
        (**self).set(name, key)
    }

    fn clear(&self, name: &str, kind: KeyKind) -> JoseResult<()> {
        (**self).clear(name, kind)
    }
}

/// Adapts a [`KeyStore`] into a [`KeySupplier`].
///
/// By default the key name is the header's `kid`, and a header without one
/// resolves nothing. A fixed name ignores the header; a required kind refuses
/// every other kind.
#[derive(Debug, Clone)]
pub struct StoreSupplier<S> {
    store: S,
    name: Option<String>,
    kind: Option<KeyKind>,
}

impl<S: KeyStore> StoreSupplier<S> {
    /// Resolve by `kid`
    pub fn new(store: S) -> Self {
        Self {
            store,
            name: None,
            kind: None,
        }
    }

    /// Always look up `name`
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only supply keys of `kind`
    #[must_use]
    pub fn of_kind(mut self, kind: KeyKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl<S: KeyStore> KeySupplier for StoreSupplier<S> {
    fn supply(&self, header: &Document, kind: KeyKind) -> Option<KeyMaterial> {
        if self.kind.is_some_and(|required| required != kind) {
            return None;
        }
        let name = match &self.name {
            Some(name) => name.as_str(),
            None => header.get_str("kid")?,
        };
        self.store.get(name, kind)
    }
}
