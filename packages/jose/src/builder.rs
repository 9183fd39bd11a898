//! Fluent assembly of claims into signed or encrypted tokens

use crate::clock::{Clock, SystemClock};
use crate::content::{ContentAlgorithm, ContentCodec};
use crate::document::Document;
use crate::error::{JoseError, JoseResult};
use crate::key_codec::KeyCodec;
use crate::key_type::{KeyKind, KeyMaterial};
use crate::signing::SigningCodec;
use crate::store::KeyStore;
use crate::token::{EncryptedToken, SignedToken, Token};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Collects claims, then binds them to codecs.
///
/// Relative times are measured from the builder's clock, truncated to whole
/// seconds.
#[derive(Clone)]
pub struct TokenBuilder {
    payload: Document,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBuilder")
            .field("claims", &self.payload.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBuilder {
    /// Empty claim set, system clock
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: Document::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Measure relative times against `clock`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Claims collected so far
    #[must_use]
    pub fn payload(&self) -> &Document {
        &self.payload
    }

    /// Set `name` to any JSON value
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    /// Copy the string, number and boolean entries of `claims`
    #[must_use]
    pub fn with_claims(mut self, claims: &Document) -> Self {
        for (name, value) in claims {
            if matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                self.payload.insert(name.clone(), value.clone());
            }
        }
        self
    }

    /// `iss`
    #[must_use]
    pub fn issued_by(self, issuer: impl Into<String>) -> Self {
        self.with_claim("iss", issuer.into())
    }

    /// `iat` at the current second
    #[must_use]
    pub fn issued_now(self) -> Self {
        let now = self.clock.now_seconds();
        self.issued_at(now)
    }

    /// `iat`
    #[must_use]
    pub fn issued_at(self, instant: DateTime<Utc>) -> Self {
        self.with_claim("iat", instant.timestamp())
    }

    /// Current second shifted by `seconds`, if representable
    fn offset(&self, claim: &str, seconds: i64) -> Option<DateTime<Utc>> {
        let at = TimeDelta::try_seconds(seconds)
            .and_then(|delta| self.clock.now_seconds().checked_add_signed(delta));
        if at.is_none() {
            tracing::warn!("Ignoring {claim} offset of {seconds} seconds: out of range");
        }
        at
    }

    /// `exp` `seconds` from the current second; negative values lie in the past.
    ///
    /// An offset that leaves the representable time range sets nothing.
    #[must_use]
    pub fn expires_in(self, seconds: i64) -> Self {
        match self.offset("exp", seconds) {
            Some(at) => self.expires_at(at),
            None => self,
        }
    }

    /// `exp`
    #[must_use]
    pub fn expires_at(self, instant: DateTime<Utc>) -> Self {
        self.with_claim("exp", instant.timestamp())
    }

    /// `nbf` `seconds` from the current second, skipped when out of range
    #[must_use]
    pub fn valid_in(self, seconds: i64) -> Self {
        match self.offset("nbf", seconds) {
            Some(at) => self.valid_at(at),
            None => self,
        }
    }

    /// `nbf`
    #[must_use]
    pub fn valid_at(self, instant: DateTime<Utc>) -> Self {
        self.with_claim("nbf", instant.timestamp())
    }

    fn header(kid: Option<&str>) -> Document {
        let mut header = Document::new();
        if let Some(kid) = kid {
            header.insert("kid".into(), Value::from(kid));
        }
        header.insert("typ".into(), Value::from("JWT"));
        header
    }

    /// JWS signed by `codec`
    #[must_use]
    pub fn signed(self, codec: SigningCodec) -> SignedToken {
        SignedToken::new(Self::header(None), self.payload, codec)
    }

    /// JWS signed by `codec`, advertising `kid`
    #[must_use]
    pub fn signed_with_kid(self, codec: SigningCodec, kid: &str) -> SignedToken {
        SignedToken::new(Self::header(Some(kid)), self.payload, codec)
    }

    /// JWS signed with `none`
    #[must_use]
    pub fn unsecured(self) -> SignedToken {
        self.signed(SigningCodec::none())
    }

    /// JWE with the content key wrapped by `key_codec`
    #[must_use]
    pub fn encrypted(self, key_codec: KeyCodec, content: ContentCodec) -> EncryptedToken {
        EncryptedToken::new(Self::header(None), self.payload, key_codec, content)
    }

    /// JWE with the content key wrapped by `key_codec`, advertising `kid`
    #[must_use]
    pub fn encrypted_with_kid(
        self,
        key_codec: KeyCodec,
        content: ContentCodec,
        kid: &str,
    ) -> EncryptedToken {
        EncryptedToken::new(Self::header(Some(kid)), self.payload, key_codec, content)
    }

    /// Pick the token shape from the key.
    ///
    /// HMAC secrets sign (HS256/384/512 by length); AES secrets wrap with
    /// AES-KW and RSA public keys with RSA-OAEP, both encrypting under
    /// A256CBC-HS512. Other kinds cannot issue tokens.
    pub fn build(self, key: KeyMaterial, kid: Option<&str>) -> JoseResult<Token> {
        let header = Self::header(kid);
        let token: Token = match key {
            KeyMaterial::Hmac(key) => {
                SignedToken::new(header, self.payload, SigningCodec::for_key(key)?).into()
            }
            KeyMaterial::Aes(key) => EncryptedToken::new(
                header,
                self.payload,
                KeyCodec::aes_kw(key)?,
                ContentCodec::generate(ContentAlgorithm::A256CbcHs512),
            )
            .into(),
            KeyMaterial::RsaPublic(key) => EncryptedToken::new(
                header,
                self.payload,
                KeyCodec::rsa_oaep_public(key),
                ContentCodec::generate(ContentAlgorithm::A256CbcHs512),
            )
            .into(),
            other => {
                return Err(JoseError::KeyUsage(format!(
                    "cannot issue tokens with a {} key",
                    other.kind()
                )));
            }
        };
        Ok(token)
    }

    /// [`TokenBuilder::build`] with the key `name` of `kind` from `store`,
    /// advertising `name` as `kid`
    pub fn build_from_store(
        self,
        store: &dyn KeyStore,
        name: &str,
        kind: KeyKind,
    ) -> JoseResult<Token> {
        let key = store
            .get(name, kind)
            .ok_or_else(|| JoseError::missing_key(format!("no {kind} key named {name}")))?;
        self.build(key, Some(name))
    }
}
