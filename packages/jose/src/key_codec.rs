//! Key encryption: transport of the per-message content key
//!
//! Each wrapping algorithm pairs an encryption-side key type with a
//! decryption-side key type through [`KeyWrap`]. A codec holds one or both
//! halves via [`KeyHalves`]; operations that need a missing half fail with
//! [`JoseError::KeyUsage`] before touching any primitive.

use crate::document::{Document, DocumentExt};
use crate::error::{AlgorithmFamily, JoseError, JoseResult};
use crate::key_type::{AES, AesKey, KeyKind, KeyMaterial, KeyType, RSA_PRIVATE, RSA_PUBLIC};
use crate::registry::{RegisteredAlgorithm, Registry, builtin};
use crate::supplier::KeySupplier;
use aes_kw::{KekAes128, KekAes192, KekAes256};
use once_cell::sync::Lazy;
use rsa::rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

/// Key-encryption algorithms usable for JWE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// RSAES-OAEP with SHA-1 and MGF1-SHA-1
    RsaOaep,
    /// AES Key Wrap with a 128-bit key
    A128Kw,
    /// AES Key Wrap with a 192-bit key
    A192Kw,
    /// AES Key Wrap with a 256-bit key
    A256Kw,
    /// No wrapping; the shared key is the content key
    Direct,
}

static KEY_ALGORITHMS: Lazy<Registry<KeyAlgorithm>> = Lazy::new(builtin::<KeyAlgorithm>);

impl RegisteredAlgorithm for KeyAlgorithm {
    const FAMILY: AlgorithmFamily = AlgorithmFamily::KeyEncryption;

    const ALL: &'static [(&'static str, Self)] = &[
        ("RSA-OAEP", Self::RsaOaep),
        ("A128KW", Self::A128Kw),
        ("A192KW", Self::A192Kw),
        ("A256KW", Self::A256Kw),
        ("dir", Self::Direct),
    ];

    fn registry() -> &'static Registry<Self> {
        &KEY_ALGORITHMS
    }
}

impl KeyAlgorithm {
    /// Key kind that wraps content keys, `None` for `dir`
    #[must_use]
    pub fn encryption_kind(self) -> Option<KeyKind> {
        match self {
            Self::RsaOaep => Some(KeyKind::RsaPublic),
            Self::A128Kw | Self::A192Kw | Self::A256Kw => Some(KeyKind::Aes),
            Self::Direct => None,
        }
    }

    /// Key kind that unwraps content keys, `None` for `dir`
    #[must_use]
    pub fn decryption_kind(self) -> Option<KeyKind> {
        match self {
            Self::RsaOaep => Some(KeyKind::RsaPrivate),
            Self::A128Kw | Self::A192Kw | Self::A256Kw => Some(KeyKind::Aes),
            Self::Direct => None,
        }
    }

    /// True for `dir`
    #[must_use]
    pub fn is_direct(self) -> bool {
        self == Self::Direct
    }

    /// Reconstruct a codec from keys resolved against `header`.
    ///
    /// Whatever halves the supplier yields are kept. At least one is required
    /// for every algorithm but `dir`.
    pub fn codec_from_supplier(
        self,
        header: &Document,
        supplier: &dyn KeySupplier,
    ) -> JoseResult<KeyCodec> {
        let missing = || {
            JoseError::missing_key(format!(
                "no key for {} (kid {:?})",
                self.id(),
                header.get_str("kid")
            ))
        };
        match self {
            Self::Direct => Ok(KeyCodec::Direct),
            Self::RsaOaep => {
                let public = supplier
                    .supply(header, KeyKind::RsaPublic)
                    .and_then(|m| RSA_PUBLIC.from_material(m));
                let private = supplier
                    .supply(header, KeyKind::RsaPrivate)
                    .and_then(|m| RSA_PRIVATE.from_material(m));
                let keys = match (public, private) {
                    (Some(public), Some(private)) => KeyHalves::Both(public, private),
                    (Some(public), None) => KeyHalves::EncryptOnly(public),
                    (None, Some(private)) => KeyHalves::DecryptOnly(private),
                    (None, None) => return Err(missing()),
                };
                Ok(KeyCodec::RsaOaep(WrapCodec::new(RsaOaep, keys)))
            }
            Self::A128Kw | Self::A192Kw | Self::A256Kw => {
                let key = supplier
                    .supply(header, KeyKind::Aes)
                    .and_then(|m| AES.from_material(m))
                    .ok_or_else(missing)?;
                KeyCodec::aes_kw_with(self, key)
            }
        }
    }
}

/// Which halves of an asymmetric or symmetric key pair a codec holds
#[derive(Debug, Clone)]
pub enum KeyHalves<E, D> {
    /// Can wrap only
    EncryptOnly(E),
    /// Can unwrap only
    DecryptOnly(D),
    /// Can wrap and unwrap
    Both(E, D),
}

impl<E, D> KeyHalves<E, D> {
    /// Encryption half, if held
    pub fn encryption_key(&self) -> Option<&E> {
        match self {
            Self::EncryptOnly(e) | Self::Both(e, _) => Some(e),
            Self::DecryptOnly(_) => None,
        }
    }

    /// Decryption half, if held
    pub fn decryption_key(&self) -> Option<&D> {
        match self {
            Self::DecryptOnly(d) | Self::Both(_, d) => Some(d),
            Self::EncryptOnly(_) => None,
        }
    }
}

/// A key-wrapping primitive over its own pair of key types
pub trait KeyWrap: Send + Sync {
    /// Key that wraps
    type EncryptionKey: Clone + Send + Sync;
    /// Key that unwraps
    type DecryptionKey: Clone + Send + Sync;

    /// Algorithm written to the `alg` header
    fn algorithm(&self) -> KeyAlgorithm;

    /// Wrap a content key
    fn wrap_key(&self, key: &Self::EncryptionKey, cek: &[u8]) -> JoseResult<Vec<u8>>;

    /// Unwrap a content key
    fn unwrap_key(&self, key: &Self::DecryptionKey, wrapped: &[u8]) -> JoseResult<Vec<u8>>;
}

/// RSA-OAEP (SHA-1 / MGF1-SHA-1)
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaOaep;

impl KeyWrap for RsaOaep {
    type EncryptionKey = RsaPublicKey;
    type DecryptionKey = RsaPrivateKey;

    fn algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::RsaOaep
    }

    fn wrap_key(&self, key: &RsaPublicKey, cek: &[u8]) -> JoseResult<Vec<u8>> {
        key.encrypt(&mut OsRng, Oaep::new::<Sha1>(), cek)
            .map_err(|e| JoseError::Crypto(format!("RSA-OAEP encryption failed: {e}")))
    }

    fn unwrap_key(&self, key: &RsaPrivateKey, wrapped: &[u8]) -> JoseResult<Vec<u8>> {
        key.decrypt(Oaep::new::<Sha1>(), wrapped)
            .map_err(|_| JoseError::Crypto("RSA-OAEP decryption failed".to_string()))
    }
}

/// AES Key Wrap (RFC 3394) at one strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesKeyWrap {
    algorithm: KeyAlgorithm,
}

impl AesKeyWrap {
    /// A128KW
    pub const A128: Self = Self {
        algorithm: KeyAlgorithm::A128Kw,
    };
    /// A192KW
    pub const A192: Self = Self {
        algorithm: KeyAlgorithm::A192Kw,
    };
    /// A256KW
    pub const A256: Self = Self {
        algorithm: KeyAlgorithm::A256Kw,
    };

    /// Strength matching a 16/24/32-byte key
    pub fn for_key_len(len: usize) -> JoseResult<Self> {
        match len {
            16 => Ok(Self::A128),
            24 => Ok(Self::A192),
            32 => Ok(Self::A256),
            other => Err(JoseError::invalid_key(format!(
                "no AES key wrap for a {other}-byte key"
            ))),
        }
    }

    /// Required key length in bytes
    #[must_use]
    pub fn key_len(&self) -> usize {
        match self.algorithm {
            KeyAlgorithm::A128Kw => 16,
            KeyAlgorithm::A192Kw => 24,
            _ => 32,
        }
    }

    fn check(&self, key: &AesKey) -> JoseResult<()> {
        if key.len() != self.key_len() {
            return Err(JoseError::invalid_key(format!(
                "{} needs a {}-byte key, got {}",
                self.algorithm.id(),
                self.key_len(),
                key.len()
            )));
        }
        Ok(())
    }
}

fn kek_error(e: aes_kw::Error) -> JoseError {
    JoseError::Crypto(format!("AES key wrap failed: {e}"))
}

impl KeyWrap for AesKeyWrap {
    type EncryptionKey = AesKey;
    type DecryptionKey = AesKey;

    fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    fn wrap_key(&self, key: &AesKey, cek: &[u8]) -> JoseResult<Vec<u8>> {
        self.check(key)?;
        let bytes = key.as_bytes();
        let wrapped = match self.algorithm {
            KeyAlgorithm::A128Kw => KekAes128::try_from(bytes).and_then(|k| k.wrap_vec(cek)),
            KeyAlgorithm::A192Kw => KekAes192::try_from(bytes).and_then(|k| k.wrap_vec(cek)),
            _ => KekAes256::try_from(bytes).and_then(|k| k.wrap_vec(cek)),
        };
        wrapped.map_err(kek_error)
    }

    fn unwrap_key(&self, key: &AesKey, wrapped: &[u8]) -> JoseResult<Vec<u8>> {
        self.check(key)?;
        let bytes = key.as_bytes();
        let cek = match self.algorithm {
            KeyAlgorithm::A128Kw => KekAes128::try_from(bytes).and_then(|k| k.unwrap_vec(wrapped)),
            KeyAlgorithm::A192Kw => KekAes192::try_from(bytes).and_then(|k| k.unwrap_vec(wrapped)),
            _ => KekAes256::try_from(bytes).and_then(|k| k.unwrap_vec(wrapped)),
        };
        cek.map_err(kek_error)
    }
}

/// A wrapping primitive bound to the key halves it may use
#[derive(Debug, Clone)]
pub struct WrapCodec<W: KeyWrap> {
    wrap: W,
    keys: KeyHalves<W::EncryptionKey, W::DecryptionKey>,
}

impl<W: KeyWrap> WrapCodec<W> {
    /// Bind `wrap` to `keys`
    pub fn new(wrap: W, keys: KeyHalves<W::EncryptionKey, W::DecryptionKey>) -> Self {
        Self { wrap, keys }
    }

    /// Held key halves
    pub fn keys(&self) -> &KeyHalves<W::EncryptionKey, W::DecryptionKey> {
        &self.keys
    }

    /// True when the encryption half is held
    pub fn can_encode(&self) -> bool {
        self.keys.encryption_key().is_some()
    }

    /// True when the decryption half is held
    pub fn can_decode(&self) -> bool {
        self.keys.decryption_key().is_some()
    }

    /// Wrap `cek` with the encryption half
    pub fn encode(&self, cek: &[u8]) -> JoseResult<Vec<u8>> {
        let key = self.keys.encryption_key().ok_or_else(|| {
            JoseError::KeyUsage(format!("{} codec cannot encode", self.wrap.algorithm().id()))
        })?;
        self.wrap.wrap_key(key, cek)
    }

    /// Unwrap `wrapped` with the decryption half
    pub fn decode(&self, wrapped: &[u8]) -> JoseResult<Vec<u8>> {
        let key = self.keys.decryption_key().ok_or_else(|| {
            JoseError::KeyUsage(format!("{} codec cannot decode", self.wrap.algorithm().id()))
        })?;
        self.wrap.unwrap_key(key, wrapped)
    }
}

/// A key-encryption algorithm bound to its keys
#[derive(Debug, Clone)]
pub enum KeyCodec {
    /// RSA-OAEP
    RsaOaep(WrapCodec<RsaOaep>),
    /// AES Key Wrap at one of three strengths
    AesKw(WrapCodec<AesKeyWrap>),
    /// `dir`: nothing is transported
    Direct,
}

impl KeyCodec {
    /// RSA-OAEP able to wrap and unwrap
    #[must_use]
    pub fn rsa_oaep_pair(public: RsaPublicKey, private: RsaPrivateKey) -> Self {
        Self::RsaOaep(WrapCodec::new(RsaOaep, KeyHalves::Both(public, private)))
    }

    /// RSA-OAEP able to wrap only
    #[must_use]
    pub fn rsa_oaep_public(public: RsaPublicKey) -> Self {
        Self::RsaOaep(WrapCodec::new(RsaOaep, KeyHalves::EncryptOnly(public)))
    }

    /// RSA-OAEP able to unwrap only
    #[must_use]
    pub fn rsa_oaep_private(private: RsaPrivateKey) -> Self {
        Self::RsaOaep(WrapCodec::new(RsaOaep, KeyHalves::DecryptOnly(private)))
    }

    /// AES Key Wrap with the strength picked from a 16/24/32-byte key
    pub fn aes_kw(key: AesKey) -> JoseResult<Self> {
        let wrap = AesKeyWrap::for_key_len(key.len())?;
        Ok(Self::AesKw(WrapCodec::new(wrap, KeyHalves::Both(key.clone(), key))))
    }

    /// A128KW; the key must be 16 bytes
    pub fn a128kw(key: AesKey) -> JoseResult<Self> {
        Self::aes_kw_with(KeyAlgorithm::A128Kw, key)
    }

    /// A192KW; the key must be 24 bytes
    pub fn a192kw(key: AesKey) -> JoseResult<Self> {
        Self::aes_kw_with(KeyAlgorithm::A192Kw, key)
    }

    /// A256KW; the key must be 32 bytes
    pub fn a256kw(key: AesKey) -> JoseResult<Self> {
        Self::aes_kw_with(KeyAlgorithm::A256Kw, key)
    }

    fn aes_kw_with(algorithm: KeyAlgorithm, key: AesKey) -> JoseResult<Self> {
        let wrap = AesKeyWrap { algorithm };
        wrap.check(&key)?;
        Ok(Self::AesKw(WrapCodec::new(wrap, KeyHalves::Both(key.clone(), key))))
    }

    /// `dir`
    #[must_use]
    pub fn direct() -> Self {
        Self::Direct
    }

    /// Bound algorithm
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::RsaOaep(_) => KeyAlgorithm::RsaOaep,
            Self::AesKw(codec) => codec.wrap.algorithm,
            Self::Direct => KeyAlgorithm::Direct,
        }
    }

    /// True when content keys can be wrapped
    #[must_use]
    pub fn can_encode(&self) -> bool {
        match self {
            Self::RsaOaep(codec) => codec.can_encode(),
            Self::AesKw(codec) => codec.can_encode(),
            Self::Direct => true,
        }
    }

    /// True when content keys can be unwrapped
    #[must_use]
    pub fn can_decode(&self) -> bool {
        match self {
            Self::RsaOaep(codec) => codec.can_decode(),
            Self::AesKw(codec) => codec.can_decode(),
            Self::Direct => true,
        }
    }

    /// Wrap a content key; `dir` yields no bytes
    pub fn encode(&self, cek: &[u8]) -> JoseResult<Vec<u8>> {
        match self {
            Self::RsaOaep(codec) => codec.encode(cek),
            Self::AesKw(codec) => codec.encode(cek),
            Self::Direct => Ok(Vec::new()),
        }
    }

    /// Unwrap a content key; `dir` yields no bytes
    pub fn decode(&self, wrapped: &[u8]) -> JoseResult<Vec<u8>> {
        match self {
            Self::RsaOaep(codec) => codec.decode(wrapped),
            Self::AesKw(codec) => codec.decode(wrapped),
            Self::Direct => Ok(Vec::new()),
        }
    }

    /// Decryption half as tagged key material, absent for `dir`
    #[must_use]
    pub fn decryption_material(&self) -> Option<KeyMaterial> {
        match self {
            Self::RsaOaep(codec) => codec
                .keys()
                .decryption_key()
                .map(|k| RSA_PRIVATE.into_material(k.clone())),
            Self::AesKw(codec) => codec
                .keys()
                .decryption_key()
                .map(|k| AES.into_material(k.clone())),
            Self::Direct => None,
        }
    }
}
