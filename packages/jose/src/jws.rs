//! JWS compact serialization: `header.payload.signature`

use crate::document::{Document, DocumentExt, decode_document, encode_document};
use crate::encoding::{b64_encode, decode_segment};
use crate::error::{JoseError, JoseResult};
use crate::registry::RegisteredAlgorithm;
use crate::signing::{SigningAlgorithm, SigningCodec};
use crate::supplier::KeySupplier;
use crate::token::SignedToken;
use subtle::ConstantTimeEq;

/// Serialize `payload` signed by `codec`; `alg` is taken from the codec
pub fn encode(header: &Document, payload: &Document, codec: &SigningCodec) -> JoseResult<String> {
    let header = header.with("alg", codec.algorithm().id());
    let header_b64 = b64_encode(encode_document(&header)?);
    let payload_b64 = b64_encode(encode_document(payload)?);
    let tag = codec.hash(&[header_b64.as_bytes(), b".", payload_b64.as_bytes()])?;
    Ok(format!("{header_b64}.{payload_b64}.{}", b64_encode(tag)))
}

/// Parse and verify a JWS.
///
/// The signature is checked over the transmitted segments before the payload
/// is decoded.
pub fn decode(input: &str, supplier: &dyn KeySupplier) -> JoseResult<SignedToken> {
    let parts: Vec<&str> = input.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts[..] else {
        tracing::debug!("Rejected JWS with {} parts", parts.len());
        return Err(JoseError::format(format!(
            "JWS needs 3 parts, found {}",
            parts.len()
        )));
    };

    let header = decode_document(&decode_segment(header_b64, "header")?)?;
    let alg = header
        .get_str("alg")
        .ok_or_else(|| JoseError::format("JWS header has no alg"))?;
    let algorithm = SigningAlgorithm::from_id(alg)?;
    let codec = SigningCodec::from_supplier(algorithm, &header, supplier)?;

    let signature = decode_segment(signature_b64, "signature")?;
    let expected = codec.hash(&[header_b64.as_bytes(), b".", payload_b64.as_bytes()])?;
    if !bool::from(expected.ct_eq(&signature)) {
        tracing::debug!("Rejected JWS: signature mismatch");
        return Err(JoseError::Authentication);
    }

    let payload = decode_document(&decode_segment(payload_b64, "payload")?)?;
    Ok(SignedToken::new(header, payload, codec))
}
