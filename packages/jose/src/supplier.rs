//! Resolution of verification and decryption keys from header metadata

use crate::content::ContentCodec;
use crate::document::Document;
use crate::error::{JoseError, JoseResult};
use crate::key_codec::KeyCodec;
use crate::key_type::{KeyKind, KeyMaterial};
use crate::signing::SigningCodec;

/// Yields the key of `kind` appropriate for a token with `header`.
///
/// Suppliers never fail; an absent key is reported as `None` and the caller
/// turns it into [`JoseError::MissingKey`].
pub trait KeySupplier: Send + Sync {
    /// Key of `kind` for a token carrying `header`
    fn supply(&self, header: &Document, kind: KeyKind) -> Option<KeyMaterial>;
}

impl<F> KeySupplier for F
where
    F: Fn(&Document, KeyKind) -> Option<KeyMaterial> + Send + Sync,
{
    fn supply(&self, header: &Document, kind: KeyKind) -> Option<KeyMaterial> {
        self(header, kind)
    }
}

/// Supplies one key regardless of header, and only for its own kind
#[derive(Debug, Clone)]
pub struct FixedKey {
    material: KeyMaterial,
}

impl FixedKey {
    /// Supply `material`
    #[must_use]
    pub fn new(material: KeyMaterial) -> Self {
        Self { material }
    }

    /// Decode `bytes` as `kind` and supply the result
    pub fn read(bytes: &[u8], kind: KeyKind) -> JoseResult<Self> {
        kind.create(bytes).map(Self::new)
    }

    /// Supply the key bound to a signing codec; `none` has no key
    pub fn from_signing(codec: &SigningCodec) -> JoseResult<Self> {
        codec
            .key()
            .map(|key| Self::new(KeyMaterial::Hmac(key.clone())))
            .ok_or_else(|| JoseError::missing_key("unprotected codec has no key"))
    }

    /// Supply the content key bound to a content codec
    #[must_use]
    pub fn from_content(codec: &ContentCodec) -> Self {
        Self::new(KeyMaterial::Content(codec.key().clone()))
    }

    /// Supply the decryption half of a key codec
    pub fn from_key_codec(codec: &KeyCodec) -> JoseResult<Self> {
        codec.decryption_material().map(Self::new).ok_or_else(|| {
            JoseError::KeyUsage("key codec holds no decryption key".to_string())
        })
    }

    /// Supplied key
    #[must_use]
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }
}

impl KeySupplier for FixedKey {
    fn supply(&self, _header: &Document, kind: KeyKind) -> Option<KeyMaterial> {
        (self.material.kind() == kind).then(|| self.material.clone())
    }
}

/// Tries each supplier in turn
#[derive(Default)]
pub struct ChainedSupplier {
    suppliers: Vec<Box<dyn KeySupplier>>,
}

impl ChainedSupplier {
    /// Empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a supplier consulted after the ones already added
    #[must_use]
    pub fn or(mut self, supplier: impl KeySupplier + 'static) -> Self {
        self.suppliers.push(Box::new(supplier));
        self
    }
}

impl KeySupplier for ChainedSupplier {
    fn supply(&self, header: &Document, kind: KeyKind) -> Option<KeyMaterial> {
        self.suppliers.iter().find_map(|s| s.supply(header, kind))
    }
}
