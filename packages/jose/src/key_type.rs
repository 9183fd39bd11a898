//! Canonical forms for raw key material
//!
//! Every [`KeyType`] is a bijection between a byte encoding and an in-memory
//! key value: `create(serialize(k)) == k`. HMAC and AES secrets are raw bytes,
//! RSA public keys are SPKI DER and RSA private keys are PKCS#8 DER.

use crate::content::{CompoundKey, ContentAlgorithm};
use crate::error::{JoseError, JoseResult};
use crate::registry::RegisteredAlgorithm;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;
use zeroize::Zeroizing;

/// Raw HMAC secret
#[derive(Clone, PartialEq, Eq)]
pub struct HmacKey(Zeroizing<Vec<u8>>);

impl HmacKey {
    /// Wrap secret bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Secret bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Secret length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty secret
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HmacKey({} bytes, REDACTED)", self.0.len())
    }
}

/// Raw AES secret (16, 24 or 32 bytes for key wrapping)
#[derive(Clone, PartialEq, Eq)]
pub struct AesKey(Zeroizing<Vec<u8>>);

impl AesKey {
    /// Wrap secret bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Secret bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Secret length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty secret
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AesKey({} bytes, REDACTED)", self.0.len())
    }
}

/// Identifies which kind of key a codec or supplier is dealing with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// HMAC signing secret
    Hmac,
    /// AES key-wrapping secret
    Aes,
    /// RSA public key (SPKI DER)
    RsaPublic,
    /// RSA private key (PKCS#8 DER)
    RsaPrivate,
    /// Content-encryption key for the given algorithm
    Content(ContentAlgorithm),
}

impl KeyKind {
    /// Stable name used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hmac => "HMAC",
            Self::Aes => "AES",
            Self::RsaPublic => "RSA_PUBLIC",
            Self::RsaPrivate => "RSA_PRIVATE",
            Self::Content(alg) => alg.id(),
        }
    }

    /// Kind stored under a key-file extension
    #[must_use]
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "key" => Some(Self::Hmac),
            "aes" => Some(Self::Aes),
            "pub" => Some(Self::RsaPublic),
            "rsa" => Some(Self::RsaPrivate),
            _ => None,
        }
    }

    /// Kind implied by a key file's extension
    #[must_use]
    pub fn for_file(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::for_extension)
    }

    /// Decode key bytes of this kind
    pub fn create(&self, bytes: &[u8]) -> JoseResult<KeyMaterial> {
        match self {
            Self::Hmac => HMAC.create(bytes).map(KeyMaterial::Hmac),
            Self::Aes => AES.create(bytes).map(KeyMaterial::Aes),
            Self::RsaPublic => RSA_PUBLIC.create(bytes).map(KeyMaterial::RsaPublic),
            Self::RsaPrivate => RSA_PRIVATE.create(bytes).map(KeyMaterial::RsaPrivate),
            Self::Content(alg) => alg.key_type().create(bytes).map(KeyMaterial::Content),
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded key of any supported kind
#[derive(Clone)]
pub enum KeyMaterial {
    /// HMAC secret
    Hmac(HmacKey),
    /// AES secret
    Aes(AesKey),
    /// RSA public key
    RsaPublic(RsaPublicKey),
    /// RSA private key
    RsaPrivate(RsaPrivateKey),
    /// Content-encryption key
    Content(CompoundKey),
}

impl KeyMaterial {
    /// Kind of this key
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Hmac(_) => KeyKind::Hmac,
            Self::Aes(_) => KeyKind::Aes,
            Self::RsaPublic(_) => KeyKind::RsaPublic,
            Self::RsaPrivate(_) => KeyKind::RsaPrivate,
            Self::Content(key) => KeyKind::Content(key.algorithm()),
        }
    }

    /// Encode this key in its canonical byte form
    pub fn serialize(&self) -> JoseResult<Vec<u8>> {
        match self {
            Self::Hmac(key) => HMAC.serialize(key),
            Self::Aes(key) => AES.serialize(key),
            Self::RsaPublic(key) => RSA_PUBLIC.serialize(key),
            Self::RsaPrivate(key) => RSA_PRIVATE.serialize(key),
            Self::Content(key) => key.algorithm().key_type().serialize(key),
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial({})", self.kind())
    }
}

/// Bijective encoding between bytes and a typed key value
pub trait KeyType: Send + Sync {
    /// In-memory key value
    type Key: Clone + Send + Sync;

    /// Kind tag used by suppliers and stores
    fn kind(&self) -> KeyKind;

    /// Decode key bytes
    fn create(&self, bytes: &[u8]) -> JoseResult<Self::Key>;

    /// Encode a key value
    fn serialize(&self, key: &Self::Key) -> JoseResult<Vec<u8>>;

    /// Tag a typed key as [`KeyMaterial`]
    fn into_material(&self, key: Self::Key) -> KeyMaterial;

    /// Typed key out of [`KeyMaterial`], if the kinds agree
    fn from_material(&self, material: KeyMaterial) -> Option<Self::Key>;
}

/// HMAC secrets: raw bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacKeyType;

/// AES secrets: raw bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct AesKeyType;

/// RSA public keys: SPKI DER
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaPublicKeyType;

/// RSA private keys: PKCS#8 DER
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaPrivateKeyType;

/// HMAC key type
pub const HMAC: HmacKeyType = HmacKeyType;
/// AES key type
pub const AES: AesKeyType = AesKeyType;
/// RSA public key type
pub const RSA_PUBLIC: RsaPublicKeyType = RsaPublicKeyType;
/// RSA private key type
pub const RSA_PRIVATE: RsaPrivateKeyType = RsaPrivateKeyType;

impl KeyType for HmacKeyType {
    type Key = HmacKey;

    fn kind(&self) -> KeyKind {
        KeyKind::Hmac
    }

    fn create(&self, bytes: &[u8]) -> JoseResult<HmacKey> {
        if bytes.is_empty() {
            return Err(JoseError::invalid_key("empty HMAC secret"));
        }
        Ok(HmacKey::new(bytes))
    }

    fn serialize(&self, key: &HmacKey) -> JoseResult<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }

    fn into_material(&self, key: HmacKey) -> KeyMaterial {
        KeyMaterial::Hmac(key)
    }

    fn from_material(&self, material: KeyMaterial) -> Option<HmacKey> {
        match material {
            KeyMaterial::Hmac(key) => Some(key),
            _ => None,
        }
    }
}

impl KeyType for AesKeyType {
    type Key = AesKey;

    fn kind(&self) -> KeyKind {
        KeyKind::Aes
    }

    fn create(&self, bytes: &[u8]) -> JoseResult<AesKey> {
        if bytes.is_empty() {
            return Err(JoseError::invalid_key("empty AES secret"));
        }
        Ok(AesKey::new(bytes))
    }

    fn serialize(&self, key: &AesKey) -> JoseResult<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }

    fn into_material(&self, key: AesKey) -> KeyMaterial {
        KeyMaterial::Aes(key)
    }

    fn from_material(&self, material: KeyMaterial) -> Option<AesKey> {
        match material {
            KeyMaterial::Aes(key) => Some(key),
            _ => None,
        }
    }
}

impl KeyType for RsaPublicKeyType {
    type Key = RsaPublicKey;

    fn kind(&self) -> KeyKind {
        KeyKind::RsaPublic
    }

    fn create(&self, bytes: &[u8]) -> JoseResult<RsaPublicKey> {
        RsaPublicKey::from_public_key_der(bytes)
            .map_err(|e| JoseError::invalid_key(format!("unable to read RSA public key: {e}")))
    }

    fn serialize(&self, key: &RsaPublicKey) -> JoseResult<Vec<u8>> {
        key.to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| JoseError::invalid_key(format!("unable to encode RSA public key: {e}")))
    }

    fn into_material(&self, key: RsaPublicKey) -> KeyMaterial {
        KeyMaterial::RsaPublic(key)
    }

    fn from_material(&self, material: KeyMaterial) -> Option<RsaPublicKey> {
        match material {
            KeyMaterial::RsaPublic(key) => Some(key),
            _ => None,
        }
    }
}

impl KeyType for RsaPrivateKeyType {
    type Key = RsaPrivateKey;

    fn kind(&self) -> KeyKind {
        KeyKind::RsaPrivate
    }

    fn create(&self, bytes: &[u8]) -> JoseResult<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_der(bytes)
            .map_err(|e| JoseError::invalid_key(format!("unable to read RSA private key: {e}")))
    }

    fn serialize(&self, key: &RsaPrivateKey) -> JoseResult<Vec<u8>> {
        key.to_pkcs8_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| JoseError::invalid_key(format!("unable to encode RSA private key: {e}")))
    }

    fn into_material(&self, key: RsaPrivateKey) -> KeyMaterial {
        KeyMaterial::RsaPrivate(key)
    }

    fn from_material(&self, material: KeyMaterial) -> Option<RsaPrivateKey> {
        match material {
            KeyMaterial::RsaPrivate(key) => Some(key),
            _ => None,
        }
    }
}
