//! JWE compact serialization: `header.encrypted_key.iv.ciphertext.tag`
//!
//! The base64url header text is the additional authenticated data. On read,
//! the tag is recomputed by re-encrypting the recovered plaintext under the same
//! key and IV; every unwrap, decrypt or tag failure surfaces as
//! [`JoseError::Authentication`].

use crate::content::{ContentAlgorithm, ContentCodec};
use crate::document::{Document, DocumentExt, decode_document, encode_document};
use crate::encoding::{b64_encode, decode_segment};
use crate::error::{JoseError, JoseResult};
use crate::key_codec::{KeyAlgorithm, KeyCodec};
use crate::key_type::{KeyKind, KeyType};
use crate::registry::RegisteredAlgorithm;
use crate::supplier::KeySupplier;
use crate::token::EncryptedToken;
use subtle::ConstantTimeEq;

/// Serialize `payload` encrypted under `content`, with its key wrapped by
/// `key_codec`; `alg` and `enc` are taken from the codecs
pub fn encode(
    header: &Document,
    payload: &Document,
    key_codec: &KeyCodec,
    content: &ContentCodec,
) -> JoseResult<String> {
    let header = header
        .with("alg", key_codec.algorithm().id())
        .with("enc", content.algorithm().id());
    let header_b64 = b64_encode(encode_document(&header)?);
    let wrapped = key_codec.encode(content.encoded_key())?;
    let out = content.encrypt(&encode_document(payload)?, header_b64.as_bytes())?;

    Ok(format!(
        "{header_b64}.{}.{}.{}.{}",
        b64_encode(wrapped),
        b64_encode(content.iv()),
        b64_encode(out.ciphertext),
        b64_encode(out.tag)
    ))
}

fn rejected(reason: &str) -> JoseError {
    tracing::debug!("Rejected JWE: {reason}");
    JoseError::Authentication
}

/// Parse, decrypt and authenticate a JWE
pub fn decode(input: &str, supplier: &dyn KeySupplier) -> JoseResult<EncryptedToken> {
    let parts: Vec<&str> = input.split('.').collect();
    let [header_b64, key_b64, iv_b64, ciphertext_b64, tag_b64] = parts[..] else {
        tracing::debug!("Rejected JWE with {} parts", parts.len());
        return Err(JoseError::format(format!(
            "JWE needs 5 parts, found {}",
            parts.len()
        )));
    };

    let header = decode_document(&decode_segment(header_b64, "header")?)?;
    let enc = header
        .get_str("enc")
        .ok_or_else(|| JoseError::format("JWE header has no enc"))?;
    let alg = header
        .get_str("alg")
        .ok_or_else(|| JoseError::format("JWE header has no alg"))?;
    let key_algorithm = KeyAlgorithm::from_id(alg)?;
    let content_algorithm = ContentAlgorithm::from_id(enc)?;

    let iv = decode_segment(iv_b64, "iv")?;
    if iv.len() != content_algorithm.iv_len() {
        return Err(JoseError::format(format!(
            "IV must be {} bytes, got {}",
            content_algorithm.iv_len(),
            iv.len()
        )));
    }
    let wrapped = decode_segment(key_b64, "encrypted key")?;
    let ciphertext = decode_segment(ciphertext_b64, "ciphertext")?;
    let tag = decode_segment(tag_b64, "tag")?;

    let (key_codec, content) = if key_algorithm.is_direct() {
        let key_type = content_algorithm.key_type();
        let key = supplier
            .supply(&header, KeyKind::Content(content_algorithm))
            .and_then(|m| key_type.from_material(m))
            .ok_or_else(|| {
                JoseError::missing_key(format!(
                    "no {} content key (kid {:?})",
                    content_algorithm.id(),
                    header.get_str("kid")
                ))
            })?;
        (KeyCodec::Direct, ContentCodec::with_iv(key, iv)?)
    } else {
        let key_codec = key_algorithm.codec_from_supplier(&header, supplier)?;
        if !key_codec.can_decode() {
            return Err(JoseError::KeyUsage(format!(
                "{} codec cannot decode",
                key_algorithm.id()
            )));
        }
        let cek = key_codec
            .decode(&wrapped)
            .map_err(|_| rejected("content key unwrap failed"))?;
        let content = ContentCodec::from_encoded(content_algorithm, &cek, iv)
            .map_err(|_| rejected("unwrapped content key is unusable"))?;
        (key_codec, content)
    };

    let plaintext = content
        .decrypt(&ciphertext)
        .map_err(|_| rejected("decryption failed"))?;
    let expected = content
        .encrypt(&plaintext, header_b64.as_bytes())
        .map_err(|_| rejected("tag computation failed"))?;
    if !bool::from(expected.tag.ct_eq(&tag)) {
        return Err(rejected("tag mismatch"));
    }

    let payload = decode_document(&plaintext)?;
    Ok(EncryptedToken::new(header, payload, key_codec, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_type::{AesKey, KeyMaterial};
    use crate::supplier::FixedKey;
    use crate::token::Jwt;
    use serde_json::json;

    fn payload() -> Document {
        match json!({"iss": "test", "n": 7}) {
            serde_json::Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn test_four_dots_and_header_ids() {
        let key = KeyCodec::a128kw(AesKey::new(vec![1u8; 16])).unwrap();
        let content = ContentCodec::generate(ContentAlgorithm::A192CbcHs384);
        let compact = encode(&Document::new(), &payload(), &key, &content).unwrap();
        assert_eq!(compact.matches('.').count(), 4);

        let token = decode(&compact, &FixedKey::from_key_codec(&key).unwrap()).unwrap();
        assert_eq!(token.header().get_str("alg"), Some("A128KW"));
        assert_eq!(token.header().get_str("enc"), Some("A192CBC-HS384"));
        assert_eq!(token.payload(), &payload());
        assert!(token.is_encrypted());
    }

    #[test]
    fn test_direct_has_empty_key_segment() {
        let content = ContentCodec::generate(ContentAlgorithm::A128CbcHs256);
        let compact = encode(&Document::new(), &payload(), &KeyCodec::direct(), &content).unwrap();
        assert_eq!(compact.split('.').nth(1), Some(""));

        let token = decode(&compact, &FixedKey::from_content(&content)).unwrap();
        assert_eq!(token.payload(), &payload());
        assert_eq!(token.key_codec().algorithm(), KeyAlgorithm::Direct);
    }

    #[test]
    fn test_wrong_wrapping_key_is_authentication_failure() {
        let key = KeyCodec::a256kw(AesKey::new(vec![1u8; 32])).unwrap();
        let content = ContentCodec::generate(ContentAlgorithm::A256CbcHs512);
        let compact = encode(&Document::new(), &payload(), &key, &content).unwrap();

        let other = FixedKey::new(KeyMaterial::Aes(AesKey::new(vec![2u8; 32])));
        assert!(matches!(decode(&compact, &other), Err(JoseError::Authentication)));
    }

    #[test]
    fn test_missing_enc_is_format_error() {
        let header = b64_encode(br#"{"alg":"dir"}"#);
        let compact = format!("{header}..AAAA.AAAA.AAAA");
        let supplier = FixedKey::new(KeyMaterial::Aes(AesKey::new(vec![1u8; 16])));
        assert!(matches!(decode(&compact, &supplier), Err(JoseError::Format(_))));
    }

    #[test]
    fn test_short_iv_is_format_error() {
        let header = b64_encode(br#"{"alg":"dir","enc":"A128CBC-HS256"}"#);
        let compact = format!("{header}..AAAA.AAAA.AAAA");
        let supplier = FixedKey::new(KeyMaterial::Aes(AesKey::new(vec![1u8; 16])));
        assert!(matches!(decode(&compact, &supplier), Err(JoseError::Format(_))));
    }
}
