//! Compact JWS / JWE engine
//!
//! This crate provides:
//! - HS256, HS384 and HS512 signing, plus explicitly unprotected `none` tokens
//! - A128CBC-HS256, A192CBC-HS384 and A256CBC-HS512 content encryption
//! - RSA-OAEP, A128KW, A192KW, A256KW and `dir` key management
//! - Header-driven key resolution through [`KeySupplier`] and [`KeyStore`]
//! - A [`Verifier`] with time, protection, claim and single-use checks
//!
//! ```no_run
//! use cryypt_jose::{FixedKey, HmacKey, Jwt, KeyMaterial, SigningCodec, TokenBuilder, Verifier};
//!
//! # fn main() -> cryypt_jose::JoseResult<()> {
//! let key = HmacKey::new(vec![7u8; 32]);
//! let compact = TokenBuilder::new()
//!     .issued_by("test")
//!     .issued_now()
//!     .expires_in(3600)
//!     .signed(SigningCodec::hs256(key.clone()))
//!     .to_compact()?;
//!
//! let token = cryypt_jose::read_any(&compact, &FixedKey::new(KeyMaterial::Hmac(key)))?;
//! assert!(Verifier::new().with_claim("iss", "test").verify(&token));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod clock;
pub mod content;
pub mod document;
pub mod encoding;
mod error;
pub mod jwe;
pub mod jws;
pub mod key_codec;
pub mod key_type;
pub mod reader;
pub mod registry;
pub mod replay;
pub mod signing;
pub mod store;
pub mod supplier;
pub mod token;
pub mod verifier;

pub use builder::TokenBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{CompoundKey, ContentAlgorithm, ContentCodec, CryptOutput};
pub use document::{Document, DocumentExt};
pub use error::*;
pub use key_codec::{KeyAlgorithm, KeyCodec, KeyHalves};
pub use key_type::{AesKey, HmacKey, KeyKind, KeyMaterial, KeyType};
pub use reader::read_any;
pub use registry::RegisteredAlgorithm;
pub use replay::UsedTokenCache;
pub use signing::{SigningAlgorithm, SigningCodec};
pub use store::{FileKeyStore, KeyStore, MemoryKeyStore, StoreSupplier};
pub use supplier::{ChainedSupplier, FixedKey, KeySupplier};
pub use token::{EncryptedToken, Jwt, SignedToken, Token};
pub use verifier::{Rejection, Verifier, VerifierOptions};
