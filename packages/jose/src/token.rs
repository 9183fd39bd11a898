//! Parsed or built tokens and their claim accessors

use crate::clock::{Clock, SystemClock};
use crate::content::ContentCodec;
use crate::document::{Document, DocumentExt};
use crate::error::JoseResult;
use crate::key_codec::KeyCodec;
use crate::registry::RegisteredAlgorithm;
use crate::signing::SigningCodec;
use crate::{jwe, jws};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Behaviour shared by signed and encrypted tokens
pub trait Jwt {
    /// Protected header, including `alg` (and `enc` for JWE)
    fn header(&self) -> &Document;

    /// Claims
    fn payload(&self) -> &Document;

    /// True for JWE
    fn is_encrypted(&self) -> bool;

    /// True for a JWS signed with `none`
    fn is_unprotected(&self) -> bool;

    /// Compact serialization
    fn to_compact(&self) -> JoseResult<String>;

    /// Raw claim value
    fn claim(&self, name: &str) -> Option<&Value> {
        self.payload().get(name)
    }

    /// Claim as text: strings verbatim, numbers and booleans printed, anything
    /// else `None`
    fn claim_as_string(&self, name: &str) -> Option<String> {
        match self.claim(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// `iss`
    fn issuer(&self) -> Option<&str> {
        self.payload().get_str("iss")
    }

    /// `iat`
    fn issued_at(&self) -> Option<DateTime<Utc>> {
        seconds_claim(self.payload(), "iat")
    }

    /// `exp`
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        seconds_claim(self.payload(), "exp")
    }

    /// `nbf`
    fn valid_at(&self) -> Option<DateTime<Utc>> {
        seconds_claim(self.payload(), "nbf")
    }

    /// Expired by the system clock
    fn is_expired(&self) -> bool {
        self.is_expired_at(&SystemClock)
    }

    /// A token without `exp` counts as expired; otherwise it expires once
    /// `exp` is strictly before the current second
    fn is_expired_at(&self, clock: &dyn Clock) -> bool {
        self.expires_at()
            .is_none_or(|exp| exp < clock.now_seconds())
    }

    /// Valid by the system clock
    fn is_valid(&self) -> bool {
        self.is_valid_at(&SystemClock)
    }

    /// A token without `nbf` is valid; otherwise it becomes valid once the
    /// current second reaches `nbf`
    fn is_valid_at(&self, clock: &dyn Clock) -> bool {
        self.valid_at()
            .is_none_or(|nbf| nbf <= clock.now_seconds())
    }
}

fn seconds_claim(payload: &Document, name: &str) -> Option<DateTime<Utc>> {
    payload
        .get_i64(name)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// A JWS: header and payload bound to the codec that signs them
#[derive(Debug, Clone)]
pub struct SignedToken {
    header: Document,
    payload: Document,
    codec: SigningCodec,
}

impl SignedToken {
    /// Assemble a token; `alg` is set from the codec
    #[must_use]
    pub fn new(header: Document, payload: Document, codec: SigningCodec) -> Self {
        let header = header.with("alg", codec.algorithm().id());
        Self {
            header,
            payload,
            codec,
        }
    }

    /// Signing codec
    #[must_use]
    pub fn codec(&self) -> &SigningCodec {
        &self.codec
    }
}

impl Jwt for SignedToken {
    fn header(&self) -> &Document {
        &self.header
    }

    fn payload(&self) -> &Document {
        &self.payload
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    fn is_unprotected(&self) -> bool {
        self.codec.is_unprotected()
    }

    fn to_compact(&self) -> JoseResult<String> {
        jws::encode(&self.header, &self.payload, &self.codec)
    }
}

/// A JWE: header and payload bound to a key codec and a content codec
#[derive(Debug, Clone)]
pub struct EncryptedToken {
    header: Document,
    payload: Document,
    key_codec: KeyCodec,
    content: ContentCodec,
}

impl EncryptedToken {
    /// Assemble a token; `alg` and `enc` are set from the codecs
    #[must_use]
    pub fn new(
        header: Document,
        payload: Document,
        key_codec: KeyCodec,
        content: ContentCodec,
    ) -> Self {
        let header = header
            .with("alg", key_codec.algorithm().id())
            .with("enc", content.algorithm().id());
        Self {
            header,
            payload,
            key_codec,
            content,
        }
    }

    /// Key codec
    #[must_use]
    pub fn key_codec(&self) -> &KeyCodec {
        &self.key_codec
    }

    /// Content codec
    #[must_use]
    pub fn content_codec(&self) -> &ContentCodec {
        &self.content
    }

    /// Serialize with the content key wrapped by `key_codec` instead
    pub fn to_compact_with(&self, key_codec: &KeyCodec) -> JoseResult<String> {
        jwe::encode(&self.header, &self.payload, key_codec, &self.content)
    }
}

impl Jwt for EncryptedToken {
    fn header(&self) -> &Document {
        &self.header
    }

    fn payload(&self) -> &Document {
        &self.payload
    }

    fn is_encrypted(&self) -> bool {
        true
    }

    fn is_unprotected(&self) -> bool {
        false
    }

    fn to_compact(&self) -> JoseResult<String> {
        jwe::encode(&self.header, &self.payload, &self.key_codec, &self.content)
    }
}

/// Either kind of token
#[derive(Debug, Clone)]
pub enum Token {
    /// JWS
    Signed(SignedToken),
    /// JWE
    Encrypted(EncryptedToken),
}

impl Token {
    fn inner(&self) -> &dyn Jwt {
        match self {
            Self::Signed(token) => token,
            Self::Encrypted(token) => token,
        }
    }

    /// The JWS, if this is one
    #[must_use]
    pub fn as_signed(&self) -> Option<&SignedToken> {
        match self {
            Self::Signed(token) => Some(token),
            Self::Encrypted(_) => None,
        }
    }

    /// The JWE, if this is one
    #[must_use]
    pub fn as_encrypted(&self) -> Option<&EncryptedToken> {
        match self {
            Self::Encrypted(token) => Some(token),
            Self::Signed(_) => None,
        }
    }
}

impl From<SignedToken> for Token {
    fn from(token: SignedToken) -> Self {
        Self::Signed(token)
    }
}

impl From<EncryptedToken> for Token {
    fn from(token: EncryptedToken) -> Self {
        Self::Encrypted(token)
    }
}

impl Jwt for Token {
    fn header(&self) -> &Document {
        self.inner().header()
    }

    fn payload(&self) -> &Document {
        self.inner().payload()
    }

    fn is_encrypted(&self) -> bool {
        self.inner().is_encrypted()
    }

    fn is_unprotected(&self) -> bool {
        self.inner().is_unprotected()
    }

    fn to_compact(&self) -> JoseResult<String> {
        self.inner().to_compact()
    }
}
