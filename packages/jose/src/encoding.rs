//! Base64url helpers for the compact serialization
//!
//! Output never carries padding. Token segments must arrive unpadded, so a
//! compact token has exactly one encoding; the free-standing decoder also
//! accepts padded input.

use crate::error::{JoseError, JoseResult};
use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const URL_SAFE_STRICT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Base64url encoding without padding (RFC 7515)
#[inline]
pub fn b64_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(input)
}

/// Base64url decoding, padding optional
#[inline]
pub fn b64_decode(input: impl AsRef<[u8]>) -> JoseResult<Vec<u8>> {
    Ok(URL_SAFE_LENIENT.decode(input)?)
}

/// Decode one named segment of a compact token
pub(crate) fn decode_segment(input: &str, segment: &str) -> JoseResult<Vec<u8>> {
    URL_SAFE_STRICT
        .decode(input)
        .map_err(|e| JoseError::format(format!("invalid base64 in {segment}: {e}")))
}
