//! Acceptance policy for parsed tokens
//!
//! Checks run in a fixed order: time window, protection, encryption,
//! single use, then claim predicates. The first failing check decides the
//! [`Rejection`].

use crate::clock::{Clock, SystemClock};
use crate::replay::UsedTokenCache;
use crate::token::Jwt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Why a token was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// `exp` is missing or has passed
    #[error("token is expired")]
    Expired,
    /// `nbf` is in the future
    #[error("token is not yet valid")]
    NotYetValid,
    /// Signed with `none` while unprotected tokens are disallowed
    #[error("token is unprotected")]
    Unprotected,
    /// JWS while encryption is required
    #[error("token is not encrypted")]
    NotEncrypted,
    /// Identifier already used, or no usable identifier
    #[error("single-use token rejected by claim {0}")]
    Replayed(String),
    /// Required claim absent
    #[error("missing claim {0}")]
    MissingClaim(String),
    /// Claim present but the predicate failed
    #[error("claim {0} does not match")]
    ClaimMismatch(String),
}

/// Predicate over one claim value
pub type ClaimPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Serializable verifier configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierOptions {
    /// Skip the `exp`/`nbf` window check
    pub allow_expired: bool,
    /// Accept tokens signed with `none`
    pub allow_unprotected: bool,
    /// Refuse anything but JWE
    pub require_encrypted: bool,
    /// Claim holding a UUID that may be accepted only once
    pub single_use_claim: Option<String>,
    /// Claims that must be present with exactly these values
    pub claims: Map<String, Value>,
}

impl VerifierOptions {
    /// Default checks plus mandatory encryption
    #[must_use]
    pub fn strict() -> Self {
        Self {
            require_encrypted: true,
            ..Self::default()
        }
    }

    /// Accept expired and unprotected tokens.
    ///
    /// Only for tests and tooling that inspects tokens without trusting them.
    #[must_use]
    pub fn insecure_for_testing() -> Self {
        Self {
            allow_expired: true,
            allow_unprotected: true,
            ..Self::default()
        }
    }

    /// Require `name` to equal `value`
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Enforce single use of the UUID in `claim`
    #[must_use]
    pub fn single_use(mut self, claim: impl Into<String>) -> Self {
        self.single_use_claim = Some(claim.into());
        self
    }
}

/// Token acceptance policy
#[derive(Clone)]
pub struct Verifier {
    clock: Arc<dyn Clock>,
    claims: Vec<(String, ClaimPredicate)>,
    allow_expired: bool,
    allow_unprotected: bool,
    require_encrypted: bool,
    single_use: Option<Arc<UsedTokenCache>>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("claims", &self.claims.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("allow_expired", &self.allow_expired)
            .field("allow_unprotected", &self.allow_unprotected)
            .field("require_encrypted", &self.require_encrypted)
            .field("single_use", &self.single_use)
            .finish()
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    /// Verifier with every check enabled and no claim requirements
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            claims: Vec::new(),
            allow_expired: false,
            allow_unprotected: false,
            require_encrypted: false,
            single_use: None,
        }
    }

    /// Build a verifier from options, with a fresh replay cache if single use
    /// is configured
    #[must_use]
    pub fn from_options(options: &VerifierOptions) -> Self {
        let mut verifier = Self::new();
        verifier.allow_expired = options.allow_expired;
        verifier.allow_unprotected = options.allow_unprotected;
        verifier.require_encrypted = options.require_encrypted;
        for (name, value) in &options.claims {
            verifier = verifier.with_claim(name.clone(), value.clone());
        }
        if let Some(claim) = &options.single_use_claim {
            verifier.single_use = Some(Arc::new(UsedTokenCache::new(claim.clone())));
        }
        verifier
    }

    /// Judge time claims against `clock`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Require `name` to equal `value` exactly
    #[must_use]
    pub fn with_claim(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.with_claim_matching(name, move |claim| *claim == value)
    }

    /// Require `name` to be present and satisfy `predicate`; replaces any
    /// earlier requirement on the same claim
    #[must_use]
    pub fn with_claim_matching(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let predicate: ClaimPredicate = Arc::new(predicate);
        match self.claims.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = predicate,
            None => self.claims.push((name, predicate)),
        }
        self
    }

    /// Skip the `exp`/`nbf` window check
    #[must_use]
    pub fn allow_expired(mut self) -> Self {
        self.allow_expired = true;
        self
    }

    /// Accept tokens signed with `none`
    #[must_use]
    pub fn allow_unprotected(mut self) -> Self {
        self.allow_unprotected = true;
        self
    }

    /// Refuse anything but JWE
    #[must_use]
    pub fn require_encrypted(mut self) -> Self {
        self.require_encrypted = true;
        self
    }

    /// Accept each identifier in `cache`'s claim only once
    #[must_use]
    pub fn enforce_single_use(mut self, cache: Arc<UsedTokenCache>) -> Self {
        self.single_use = Some(cache);
        self
    }

    /// Replay cache in use, if any
    #[must_use]
    pub fn used_token_cache(&self) -> Option<&Arc<UsedTokenCache>> {
        self.single_use.as_ref()
    }

    /// Run every check, reporting the first failure
    pub fn check(&self, token: &dyn Jwt) -> Result<(), Rejection> {
        let result = self.evaluate(token);
        if let Err(rejection) = &result {
            tracing::debug!("Token rejected: {rejection}");
        }
        result
    }

    /// True when [`Verifier::check`] passes
    pub fn verify(&self, token: &dyn Jwt) -> bool {
        self.check(token).is_ok()
    }

    fn evaluate(&self, token: &dyn Jwt) -> Result<(), Rejection> {
        if !self.allow_expired {
            if token.is_expired_at(&*self.clock) {
                return Err(Rejection::Expired);
            }
            if !token.is_valid_at(&*self.clock) {
                return Err(Rejection::NotYetValid);
            }
        }

        if !self.allow_unprotected && token.is_unprotected() {
            return Err(Rejection::Unprotected);
        }

        if self.require_encrypted && !token.is_encrypted() {
            return Err(Rejection::NotEncrypted);
        }

        if let Some(cache) = &self.single_use {
            if !cache.validate(token) {
                tracing::warn!("Found reused one-time token! {}", cache.id_claim());
                return Err(Rejection::Replayed(cache.id_claim().to_string()));
            }
        }

        for (name, predicate) in &self.claims {
            let Some(value) = token.claim(name) else {
                return Err(Rejection::MissingClaim(name.clone()));
            };
            if !predicate(value) {
                return Err(Rejection::ClaimMismatch(name.clone()));
            }
        }
        Ok(())
    }
}
