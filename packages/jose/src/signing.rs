//! Signing codecs: HMAC-SHA2 and the unprotected `none` algorithm

use crate::document::{Document, DocumentExt};
use crate::error::{AlgorithmFamily, JoseError, JoseResult};
use crate::key_type::{HMAC, HmacKey, KeyKind, KeyType};
use crate::registry::{RegisteredAlgorithm, Registry, builtin};
use crate::supplier::KeySupplier;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use sha2::{Sha256, Sha384, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Integrity algorithms usable for JWS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// No integrity protection; the tag is empty
    None,
    /// HMAC with SHA-256
    Hs256,
    /// HMAC with SHA-384
    Hs384,
    /// HMAC with SHA-512
    Hs512,
}

static SIGNING_ALGORITHMS: Lazy<Registry<SigningAlgorithm>> = Lazy::new(builtin::<SigningAlgorithm>);

impl RegisteredAlgorithm for SigningAlgorithm {
    const FAMILY: AlgorithmFamily = AlgorithmFamily::Signing;

    const ALL: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("HS256", Self::Hs256),
        ("HS384", Self::Hs384),
        ("HS512", Self::Hs512),
    ];

    fn registry() -> &'static Registry<Self> {
        &SIGNING_ALGORITHMS
    }
}

impl SigningAlgorithm {
    /// Key kind this algorithm consumes, `None` for the unkeyed algorithm
    #[must_use]
    pub fn key_kind(self) -> Option<KeyKind> {
        match self {
            Self::None => None,
            Self::Hs256 | Self::Hs384 | Self::Hs512 => Some(HMAC.kind()),
        }
    }

    /// Tag length in bytes
    #[must_use]
    pub fn tag_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Hs256 => 32,
            Self::Hs384 => 48,
            Self::Hs512 => 64,
        }
    }

    /// MAC over the logical concatenation of `parts`.
    ///
    /// `none` ignores the key and yields an empty tag. HMAC algorithms require a
    /// key.
    pub fn hash(self, key: Option<&HmacKey>, parts: &[&[u8]]) -> JoseResult<Vec<u8>> {
        if self == Self::None {
            return Ok(Vec::new());
        }
        let key = key.ok_or_else(|| JoseError::KeyUsage(format!("{} requires a key", self.id())))?;
        match self {
            Self::Hs256 => mac_parts::<HmacSha256>(key.as_bytes(), parts),
            Self::Hs384 => mac_parts::<HmacSha384>(key.as_bytes(), parts),
            Self::Hs512 => mac_parts::<HmacSha512>(key.as_bytes(), parts),
            Self::None => Ok(Vec::new()),
        }
    }
}

/// Stream every part into one MAC context and return the raw tag
pub(crate) fn mac_parts<M: Mac + KeyInit>(key: &[u8], parts: &[&[u8]]) -> JoseResult<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| JoseError::invalid_key("invalid HMAC key"))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}

/// A signing algorithm bound to its key
#[derive(Debug, Clone)]
pub struct SigningCodec {
    algorithm: SigningAlgorithm,
    key: Option<HmacKey>,
}

impl SigningCodec {
    /// Unprotected codec
    #[must_use]
    pub fn none() -> Self {
        Self {
            algorithm: SigningAlgorithm::None,
            key: None,
        }
    }

    /// HMAC-SHA-256 codec
    #[must_use]
    pub fn hs256(key: HmacKey) -> Self {
        Self::hmac(SigningAlgorithm::Hs256, key)
    }

    /// HMAC-SHA-384 codec
    #[must_use]
    pub fn hs384(key: HmacKey) -> Self {
        Self::hmac(SigningAlgorithm::Hs384, key)
    }

    /// HMAC-SHA-512 codec
    #[must_use]
    pub fn hs512(key: HmacKey) -> Self {
        Self::hmac(SigningAlgorithm::Hs512, key)
    }

    fn hmac(algorithm: SigningAlgorithm, key: HmacKey) -> Self {
        Self {
            algorithm,
            key: Some(key),
        }
    }

    /// Pick the HMAC algorithm whose tag is as long as the secret
    pub fn for_key(key: HmacKey) -> JoseResult<Self> {
        let algorithm = [
            SigningAlgorithm::Hs256,
            SigningAlgorithm::Hs384,
            SigningAlgorithm::Hs512,
        ]
        .into_iter()
        .find(|alg| alg.tag_len() == key.len())
        .ok_or_else(|| {
            JoseError::invalid_key(format!("no HMAC algorithm for a {}-byte secret", key.len()))
        })?;
        Ok(Self::hmac(algorithm, key))
    }

    /// Codec for `algorithm` with the key resolved from `header`
    pub fn from_supplier(
        algorithm: SigningAlgorithm,
        header: &Document,
        supplier: &dyn KeySupplier,
    ) -> JoseResult<Self> {
        let Some(kind) = algorithm.key_kind() else {
            return Ok(Self::none());
        };
        let key = supplier
            .supply(header, kind)
            .and_then(|material| HMAC.from_material(material))
            .ok_or_else(|| {
                JoseError::missing_key(format!(
                    "no {kind} key for {} (kid {:?})",
                    algorithm.id(),
                    header.get_str("kid")
                ))
            })?;
        Ok(Self::hmac(algorithm, key))
    }

    /// Bound algorithm
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Bound key, absent for `none`
    #[must_use]
    pub fn key(&self) -> Option<&HmacKey> {
        self.key.as_ref()
    }

    /// Tag over the logical concatenation of `parts`
    pub fn hash(&self, parts: &[&[u8]]) -> JoseResult<Vec<u8>> {
        self.algorithm.hash(self.key.as_ref(), parts)
    }

    /// True for the unprotected codec
    #[must_use]
    pub fn is_unprotected(&self) -> bool {
        self.algorithm == SigningAlgorithm::None
    }
}
