//! One file per key under a folder, named `<name>.<ext>`

use super::KeyStore;
use crate::error::{JoseError, JoseResult};
use crate::key_type::{KeyKind, KeyMaterial};
use dashmap::DashMap;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key store backed by a folder of key files.
///
/// Keys are read lazily on first use and cached. Only kinds with a configured
/// extension are stored; the defaults are `key` (HMAC), `aes` (AES), `pub`
/// (RSA public) and `rsa` (RSA private).
#[derive(Debug)]
pub struct FileKeyStore {
    folder: PathBuf,
    extensions: HashMap<KeyKind, String>,
    cache: DashMap<(String, KeyKind), KeyMaterial>,
}

impl FileKeyStore {
    /// Store rooted at `folder` with the default extensions.
    ///
    /// Content keys have no default extension and are never read from disk.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        let extensions = [
            (KeyKind::Hmac, "key"),
            (KeyKind::Aes, "aes"),
            (KeyKind::RsaPublic, "pub"),
            (KeyKind::RsaPrivate, "rsa"),
        ]
        .into_iter()
        .map(|(kind, ext)| (kind, ext.to_string()))
        .collect();
        Self::with_extensions(folder, extensions)
    }

    /// Store rooted at `folder` handling only the kinds in `extensions`
    pub fn with_extensions(
        folder: impl Into<PathBuf>,
        extensions: HashMap<KeyKind, String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            extensions,
            cache: DashMap::new(),
        }
    }

    /// Root folder
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File holding `name` of `kind`, if the kind is handled and the name is a
    /// plain file stem
    fn key_path(&self, name: &str, kind: KeyKind) -> Option<PathBuf> {
        let Some(ext) = self.extensions.get(&kind) else {
            if matches!(kind, KeyKind::Content(_)) {
                tracing::debug!("No file extension for {kind} content keys");
            } else {
                tracing::warn!("Requested key with unknown type {kind}");
            }
            return None;
        };
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            tracing::warn!("Rejected key name that is not a plain file name");
            return None;
        }
        Some(self.folder.join(format!("{name}.{ext}")))
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, name: &str, kind: KeyKind) -> Option<KeyMaterial> {
        let cache_key = (name.to_string(), kind);
        if let Some(entry) = self.cache.get(&cache_key) {
            return Some(entry.value().clone());
        }

        let path = self.key_path(name, kind)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No key file {}", path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Unable to read key file {}: {e}", path.display());
                return None;
            }
        };

        match kind.create(&bytes) {
            Ok(key) => {
                self.cache.insert(cache_key, key.clone());
                Some(key)
            }
            Err(e) => {
                tracing::warn!("Unable to read key {name}: {e}");
                None
            }
        }
    }

    fn set(&self, name: &str, key: KeyMaterial) -> JoseResult<()> {
        let kind = key.kind();
        let path = self.key_path(name, kind).ok_or_else(|| {
            JoseError::invalid_key(format!("cannot store {kind} key under {name:?}"))
        })?;
        let bytes = key.serialize()?;
        if let Err(e) = std::fs::write(&path, &bytes) {
            tracing::warn!("Unable to save key {name}: {e}");
            return Err(e.into());
        }
        self.cache.insert((name.to_string(), kind), key);
        Ok(())
    }

    fn clear(&self, name: &str, kind: KeyKind) -> JoseResult<()> {
        self.cache.remove(&(name.to_string(), kind));
        let Some(path) = self.key_path(name, kind) else {
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                tracing::warn!("An error occurred while deleting key file {}: {e}", path.display());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CompoundKey, ContentAlgorithm};
    use crate::key_type::{AesKey, HmacKey};

    #[test]
    fn test_set_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        store
            .set("signing", KeyMaterial::Hmac(HmacKey::new(vec![7u8; 32])))
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("signing.key")).unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn test_get_reads_lazily_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wrap.aes"), [3u8; 16]).unwrap();
        let store = FileKeyStore::new(dir.path());

        let key = store.get("wrap", KeyKind::Aes).unwrap();
        assert_eq!(key.kind(), KeyKind::Aes);

        std::fs::remove_file(dir.path().join("wrap.aes")).unwrap();
        assert!(store.get("wrap", KeyKind::Aes).is_some());
        assert!(store.get("wrap", KeyKind::Hmac).is_none());
    }

    #[test]
    fn test_clear_removes_file_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        store
            .set("old", KeyMaterial::Aes(AesKey::new(vec![1u8; 24])))
            .unwrap();
        store.clear("old", KeyKind::Aes).unwrap();
        assert!(!dir.path().join("old.aes").exists());
        assert!(store.get("old", KeyKind::Aes).is_none());
        store.clear("never", KeyKind::Aes).unwrap();
    }

    #[test]
    fn test_unknown_kind_and_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut extensions = HashMap::new();
        extensions.insert(KeyKind::Hmac, "secret".to_string());
        let store = FileKeyStore::with_extensions(dir.path(), extensions);

        assert!(store
            .set("a", KeyMaterial::Aes(AesKey::new(vec![1u8; 16])))
            .is_err());
        assert!(store
            .set("../escape", KeyMaterial::Hmac(HmacKey::new(vec![1u8; 32])))
            .is_err());
        store
            .set("a", KeyMaterial::Hmac(HmacKey::new(vec![1u8; 32])))
            .unwrap();
        assert!(dir.path().join("a.secret").exists());
    }

    #[test]
    fn test_content_kinds_are_not_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());
        let kind = KeyKind::Content(ContentAlgorithm::A128CbcHs256);

        assert!(store.get("cek", kind).is_none());
        let key = CompoundKey::generate(ContentAlgorithm::A128CbcHs256);
        assert!(matches!(
            store.set("cek", KeyMaterial::Content(key)),
            Err(JoseError::InvalidKey(_))
        ));
        store.clear("cek", kind).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_content_kind_with_configured_extension() {
        let dir = tempfile::tempdir().unwrap();
        let kind = KeyKind::Content(ContentAlgorithm::A128CbcHs256);
        let store =
            FileKeyStore::with_extensions(dir.path(), HashMap::from([(kind, "cek".to_string())]));

        let key = CompoundKey::generate(ContentAlgorithm::A128CbcHs256);
        store.set("direct", KeyMaterial::Content(key.clone())).unwrap();
        assert_eq!(std::fs::read(dir.path().join("direct.cek")).unwrap(), key.as_bytes());

        let reopened =
            FileKeyStore::with_extensions(dir.path(), HashMap::from([(kind, "cek".to_string())]));
        assert_eq!(reopened.get("direct", kind).map(|m| m.kind()), Some(kind));
    }

    #[test]
    fn test_corrupt_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pub"), b"garbage").unwrap();
        let store = FileKeyStore::new(dir.path());
        assert!(store.get("broken", KeyKind::RsaPublic).is_none());
    }
}
