//! Content encryption: composite AES-CBC + HMAC-SHA2 authenticated encryption
//!
//! A content key of `L` bytes is split into two halves. The first half keys
//! AES-CBC with PKCS#7 padding, the last half keys the HMAC that produces the
//! authentication tag over `aad || iv || ciphertext || BE64(len(aad))`.
//!
//! Decryption never checks the tag. Callers recompute it with [`ContentCodec::encrypt`]
//! over the recovered plaintext and compare before trusting anything.

use crate::error::{AlgorithmFamily, JoseError, JoseResult};
use crate::key_type::{KeyKind, KeyMaterial, KeyType};
use crate::registry::{RegisteredAlgorithm, Registry, builtin};
use crate::signing::mac_parts;
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hmac::Hmac;
use once_cell::sync::Lazy;
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// IV length shared by every CBC variant
pub const IV_LEN: usize = 16;

/// Content-encryption algorithms usable for JWE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentAlgorithm {
    /// AES-128-CBC with HMAC-SHA-256, 32-byte key
    A128CbcHs256,
    /// AES-192-CBC with HMAC-SHA-384, 48-byte key
    A192CbcHs384,
    /// AES-256-CBC with HMAC-SHA-512, 64-byte key
    A256CbcHs512,
}

static CONTENT_ALGORITHMS: Lazy<Registry<ContentAlgorithm>> =
    Lazy::new(builtin::<ContentAlgorithm>);

impl RegisteredAlgorithm for ContentAlgorithm {
    const FAMILY: AlgorithmFamily = AlgorithmFamily::ContentEncryption;

    const ALL: &'static [(&'static str, Self)] = &[
        ("A128CBC-HS256", Self::A128CbcHs256),
        ("A192CBC-HS384", Self::A192CbcHs384),
        ("A256CBC-HS512", Self::A256CbcHs512),
    ];

    fn registry() -> &'static Registry<Self> {
        &CONTENT_ALGORITHMS
    }
}

impl ContentAlgorithm {
    /// Full content-key length in bytes
    #[must_use]
    pub fn key_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
        }
    }

    /// IV length in bytes
    #[must_use]
    pub fn iv_len(self) -> usize {
        IV_LEN
    }

    /// Key type that decodes this algorithm's content keys
    #[must_use]
    pub fn key_type(self) -> CompoundKeyType {
        CompoundKeyType(self)
    }

    /// Encrypt `plaintext` and tag `aad || iv || ciphertext || BE64(len(aad))`
    pub fn encode(
        self,
        key: &CompoundKey,
        plaintext: &[u8],
        iv: &[u8],
        aad: &[u8],
    ) -> JoseResult<CryptOutput> {
        self.check_key(key)?;
        let ciphertext = match self {
            Self::A128CbcHs256 => cbc_encrypt::<cbc::Encryptor<Aes128>>(key.enc_key(), iv, plaintext),
            Self::A192CbcHs384 => cbc_encrypt::<cbc::Encryptor<Aes192>>(key.enc_key(), iv, plaintext),
            Self::A256CbcHs512 => cbc_encrypt::<cbc::Encryptor<Aes256>>(key.enc_key(), iv, plaintext),
        }?;

        let aad_len = (aad.len() as u64).to_be_bytes();
        let parts: [&[u8]; 4] = [aad, iv, &ciphertext, &aad_len];
        let tag = match self {
            Self::A128CbcHs256 => mac_parts::<Hmac<Sha256>>(key.mac_key(), &parts),
            Self::A192CbcHs384 => mac_parts::<Hmac<Sha384>>(key.mac_key(), &parts),
            Self::A256CbcHs512 => mac_parts::<Hmac<Sha512>>(key.mac_key(), &parts),
        }?;

        Ok(CryptOutput { ciphertext, tag })
    }

    /// Decrypt without any tag check
    pub fn decode(self, key: &CompoundKey, ciphertext: &[u8], iv: &[u8]) -> JoseResult<Vec<u8>> {
        self.check_key(key)?;
        match self {
            Self::A128CbcHs256 => cbc_decrypt::<cbc::Decryptor<Aes128>>(key.enc_key(), iv, ciphertext),
            Self::A192CbcHs384 => cbc_decrypt::<cbc::Decryptor<Aes192>>(key.enc_key(), iv, ciphertext),
            Self::A256CbcHs512 => cbc_decrypt::<cbc::Decryptor<Aes256>>(key.enc_key(), iv, ciphertext),
        }
    }

    fn check_key(self, key: &CompoundKey) -> JoseResult<()> {
        if key.algorithm() != self {
            return Err(JoseError::invalid_key(format!(
                "{} key used with {}",
                key.algorithm().id(),
                self.id()
            )));
        }
        Ok(())
    }
}

fn cbc_encrypt<C: BlockEncryptMut + KeyIvInit>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> JoseResult<Vec<u8>> {
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| JoseError::Crypto(format!("IV must be {IV_LEN} bytes")))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C: BlockDecryptMut + KeyIvInit>(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> JoseResult<Vec<u8>> {
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| JoseError::Crypto(format!("IV must be {IV_LEN} bytes")))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| JoseError::Crypto("unable to decrypt content".to_string()))
}

/// Ciphertext and authentication tag from one encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptOutput {
    /// AES-CBC ciphertext, PKCS#7 padded
    pub ciphertext: Vec<u8>,
    /// Full HMAC output
    pub tag: Vec<u8>,
}

/// Content key split into an AES half and an HMAC half.
///
/// The full secret stays the canonical serialized form.
#[derive(Clone, PartialEq, Eq)]
pub struct CompoundKey {
    algorithm: ContentAlgorithm,
    raw: Zeroizing<Vec<u8>>,
}

impl CompoundKey {
    /// Split `raw` for `algorithm`; the length must match the algorithm exactly
    pub fn new(algorithm: ContentAlgorithm, raw: impl Into<Vec<u8>>) -> JoseResult<Self> {
        let raw = Zeroizing::new(raw.into());
        if raw.len() != algorithm.key_len() {
            return Err(JoseError::invalid_key(format!(
                "{} needs a {}-byte key, got {}",
                algorithm.id(),
                algorithm.key_len(),
                raw.len()
            )));
        }
        Ok(Self { algorithm, raw })
    }

    /// Fresh random key for `algorithm`
    #[must_use]
    pub fn generate(algorithm: ContentAlgorithm) -> Self {
        let mut raw = Zeroizing::new(vec![0u8; algorithm.key_len()]);
        rand::rng().fill_bytes(&mut raw);
        Self { algorithm, raw }
    }

    /// Algorithm this key belongs to
    #[must_use]
    pub fn algorithm(&self) -> ContentAlgorithm {
        self.algorithm
    }

    /// AES subkey: the first half
    #[must_use]
    pub fn enc_key(&self) -> &[u8] {
        &self.raw[..self.raw.len() / 2]
    }

    /// HMAC subkey: the last half
    #[must_use]
    pub fn mac_key(&self) -> &[u8] {
        &self.raw[self.raw.len() / 2..]
    }

    /// Full secret
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl std::fmt::Debug for CompoundKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompoundKey({}, REDACTED)", self.algorithm.id())
    }
}

/// Key type for one content algorithm's compound keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundKeyType(ContentAlgorithm);

impl KeyType for CompoundKeyType {
    type Key = CompoundKey;

    fn kind(&self) -> KeyKind {
        KeyKind::Content(self.0)
    }

    fn create(&self, bytes: &[u8]) -> JoseResult<CompoundKey> {
        CompoundKey::new(self.0, bytes)
    }

    fn serialize(&self, key: &CompoundKey) -> JoseResult<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }

    fn into_material(&self, key: CompoundKey) -> KeyMaterial {
        KeyMaterial::Content(key)
    }

    fn from_material(&self, material: KeyMaterial) -> Option<CompoundKey> {
        match material {
            KeyMaterial::Content(key) if key.algorithm() == self.0 => Some(key),
            _ => None,
        }
    }
}

/// A content algorithm bound to a key and a per-message IV
#[derive(Debug, Clone)]
pub struct ContentCodec {
    key: CompoundKey,
    iv: Vec<u8>,
}

impl ContentCodec {
    /// Random key and random IV
    #[must_use]
    pub fn generate(algorithm: ContentAlgorithm) -> Self {
        Self::new(CompoundKey::generate(algorithm))
    }

    /// Given key, random IV
    #[must_use]
    pub fn new(key: CompoundKey) -> Self {
        let mut iv = vec![0u8; key.algorithm().iv_len()];
        rand::rng().fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Given key and IV, as when reconstructing a codec to verify a message
    pub fn with_iv(key: CompoundKey, iv: impl Into<Vec<u8>>) -> JoseResult<Self> {
        let iv = iv.into();
        if iv.len() != key.algorithm().iv_len() {
            return Err(JoseError::format(format!(
                "IV must be {} bytes, got {}",
                key.algorithm().iv_len(),
                iv.len()
            )));
        }
        Ok(Self { key, iv })
    }

    /// Decode `encoded_key` for `algorithm` and bind it with `iv`
    pub fn from_encoded(
        algorithm: ContentAlgorithm,
        encoded_key: &[u8],
        iv: impl Into<Vec<u8>>,
    ) -> JoseResult<Self> {
        Self::with_iv(algorithm.key_type().create(encoded_key)?, iv)
    }

    /// Bound algorithm
    #[must_use]
    pub fn algorithm(&self) -> ContentAlgorithm {
        self.key.algorithm()
    }

    /// Bound key
    #[must_use]
    pub fn key(&self) -> &CompoundKey {
        &self.key
    }

    /// Canonical bytes of the bound key
    #[must_use]
    pub fn encoded_key(&self) -> &[u8] {
        self.key.as_bytes()
    }

    /// Bound IV
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Encrypt and tag under the bound key and IV
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> JoseResult<CryptOutput> {
        self.algorithm().encode(&self.key, plaintext, &self.iv, aad)
    }

    /// Decrypt under the bound key and IV; no tag check
    pub fn decrypt(&self, ciphertext: &[u8]) -> JoseResult<Vec<u8>> {
        self.algorithm().decode(&self.key, ciphertext, &self.iv)
    }
}
