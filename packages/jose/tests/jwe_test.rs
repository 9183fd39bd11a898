//! JWE issue, decryption and tamper detection across every algorithm pairing

use chrono::DateTime;
use cryypt_jose::document::{decode_document, encode_document};
use cryypt_jose::encoding::{b64_decode, b64_encode};
use cryypt_jose::{
    AesKey, ContentAlgorithm, ContentCodec, DocumentExt, FixedKey, JoseError, Jwt, KeyAlgorithm,
    KeyCodec, KeyMaterial, KeySupplier, RegisteredAlgorithm, TokenBuilder, jwe, read_any,
};
use once_cell::sync::Lazy;
use rsa::RsaPrivateKey;
use std::sync::Arc;

const ISSUED_AT: i64 = 1_700_000_000;
const EXPIRES_AT: i64 = 1_700_003_600;
const VALID_AT: i64 = 1_699_999_990;

const CONTENT: [ContentAlgorithm; 3] = [
    ContentAlgorithm::A128CbcHs256,
    ContentAlgorithm::A192CbcHs384,
    ContentAlgorithm::A256CbcHs512,
];

static RSA_KEY: Lazy<RsaPrivateKey> = Lazy::new(|| {
    RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024).expect("RSA key generation")
});

fn key_codec(alg: KeyAlgorithm) -> KeyCodec {
    match alg {
        KeyAlgorithm::RsaOaep => {
            KeyCodec::rsa_oaep_pair(RSA_KEY.to_public_key(), RSA_KEY.clone())
        }
        KeyAlgorithm::A128Kw => KeyCodec::a128kw(AesKey::new(vec![0x11; 16])).unwrap(),
        KeyAlgorithm::A192Kw => KeyCodec::a192kw(AesKey::new(vec![0x22; 24])).unwrap(),
        KeyAlgorithm::A256Kw => KeyCodec::a256kw(AesKey::new(vec![0x33; 32])).unwrap(),
        KeyAlgorithm::Direct => KeyCodec::direct(),
    }
}

fn supplier(key: &KeyCodec, content: &ContentCodec) -> FixedKey {
    match key {
        KeyCodec::Direct => FixedKey::from_content(content),
        other => FixedKey::from_key_codec(other).unwrap(),
    }
}

fn builder() -> TokenBuilder {
    TokenBuilder::new()
        .issued_by("test")
        .issued_at(DateTime::from_timestamp(ISSUED_AT, 0).unwrap())
        .expires_at(DateTime::from_timestamp(EXPIRES_AT, 0).unwrap())
        .valid_at(DateTime::from_timestamp(VALID_AT, 0).unwrap())
}

fn a256kw_token() -> (String, FixedKey) {
    let key = KeyCodec::a256kw(AesKey::new((0u8..32).collect::<Vec<_>>())).unwrap();
    let content = ContentCodec::generate(ContentAlgorithm::A256CbcHs512);
    let supplier = supplier(&key, &content);
    let compact = builder()
        .encrypted(key, content)
        .to_compact()
        .unwrap();
    (compact, supplier)
}

fn segments(compact: &str) -> Vec<String> {
    compact.split('.').map(str::to_string).collect()
}

fn flip_segment(compact: &str, index: usize) -> String {
    let mut parts = segments(compact);
    let mut raw = b64_decode(&parts[index]).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0x80;
    parts[index] = b64_encode(raw);
    parts.join(".")
}

fn rewrite_header(compact: &str, key: &str, value: &str) -> String {
    let mut parts = segments(compact);
    let header = decode_document(&b64_decode(&parts[0]).unwrap()).unwrap();
    parts[0] = b64_encode(encode_document(&header.with(key, value)).unwrap());
    parts.join(".")
}

#[test]
fn test_every_key_and_content_pairing() {
    for key_alg in [
        KeyAlgorithm::RsaOaep,
        KeyAlgorithm::A128Kw,
        KeyAlgorithm::A192Kw,
        KeyAlgorithm::A256Kw,
        KeyAlgorithm::Direct,
    ] {
        for content_alg in CONTENT {
            let key = key_codec(key_alg);
            let content = ContentCodec::generate(content_alg);
            let supplier = supplier(&key, &content);
            let compact = builder()
                .encrypted_with_kid(key, content, "k1")
                .to_compact()
                .unwrap();
            assert_eq!(compact.matches('.').count(), 4);

            let token = jwe::decode(&compact, &supplier).unwrap();
            assert_eq!(token.header().get_str("alg"), Some(key_alg.id()));
            assert_eq!(token.header().get_str("enc"), Some(content_alg.id()));
            assert_eq!(token.header().get_str("kid"), Some("k1"));
            assert_eq!(token.key_codec().algorithm(), key_alg);
            assert_eq!(token.content_codec().algorithm(), content_alg);
            assert_eq!(token.issuer(), Some("test"));
            assert_eq!(token.issued_at().map(|t| t.timestamp()), Some(ISSUED_AT));
            assert_eq!(token.expires_at().map(|t| t.timestamp()), Some(EXPIRES_AT));
            assert_eq!(token.valid_at().map(|t| t.timestamp()), Some(VALID_AT));
        }
    }
}

#[test]
fn test_a256kw_with_a256cbc_hs512() {
    let (compact, supplier) = a256kw_token();
    assert_eq!(compact.matches('.').count(), 4);

    let token = read_any(&compact, &supplier).unwrap();
    assert!(token.is_encrypted());
    assert!(!token.is_unprotected());
    assert_eq!(token.header().get_str("alg"), Some("A256KW"));
    assert_eq!(token.header().get_str("enc"), Some("A256CBC-HS512"));
    assert_eq!(token.issuer(), Some("test"));
}

#[test]
fn test_reencoding_a_parsed_token() {
    let (compact, supplier) = a256kw_token();
    let token = jwe::decode(&compact, &supplier).unwrap();
    let again = token.to_compact().unwrap();
    assert_eq!(jwe::decode(&again, &supplier).unwrap().payload(), token.payload());
}

#[test]
fn test_to_compact_with_rewraps_content_key() {
    let (compact, supplier) = a256kw_token();
    let token = jwe::decode(&compact, &supplier).unwrap();

    let rsa = KeyCodec::rsa_oaep_pair(RSA_KEY.to_public_key(), RSA_KEY.clone());
    let rewrapped = token.to_compact_with(&rsa).unwrap();
    let parsed = jwe::decode(&rewrapped, &FixedKey::from_key_codec(&rsa).unwrap()).unwrap();
    assert_eq!(parsed.header().get_str("alg"), Some("RSA-OAEP"));
    assert_eq!(parsed.payload(), token.payload());
    assert_eq!(
        parsed.content_codec().encoded_key(),
        token.content_codec().encoded_key()
    );
}

#[test]
fn test_public_only_codec_cannot_decrypt() {
    let key = KeyCodec::rsa_oaep_public(RSA_KEY.to_public_key());
    let content = ContentCodec::generate(ContentAlgorithm::A128CbcHs256);
    let compact = builder().encrypted(key, content).to_compact().unwrap();

    let public_only = FixedKey::new(KeyMaterial::RsaPublic(RSA_KEY.to_public_key()));
    assert!(matches!(
        jwe::decode(&compact, &public_only),
        Err(JoseError::KeyUsage(_))
    ));
    let private = FixedKey::new(KeyMaterial::RsaPrivate(RSA_KEY.clone()));
    assert!(jwe::decode(&compact, &private).is_ok());
}

#[test]
fn test_unregistered_enc_is_unsupported() {
    let (compact, supplier) = a256kw_token();
    let altered = rewrite_header(&compact, "enc", "A256GCM");
    assert!(matches!(
        jwe::decode(&altered, &supplier),
        Err(JoseError::UnsupportedAlgorithm { .. })
    ));
}

#[test]
fn test_altered_header_fails_authentication() {
    let (compact, supplier) = a256kw_token();
    let altered = rewrite_header(&compact, "typ", "JOSE");
    assert!(matches!(
        jwe::decode(&altered, &supplier),
        Err(JoseError::Authentication)
    ));
}

#[test]
fn test_tampered_segments_fail_authentication() {
    let (compact, supplier) = a256kw_token();
    for (index, name) in [(1, "encrypted key"), (2, "iv"), (3, "ciphertext"), (4, "tag")] {
        let tampered = flip_segment(&compact, index);
        assert!(
            jwe::decode(&tampered, &supplier)
                .unwrap_err()
                .is_authentication(),
            "tampered {name} was accepted"
        );
    }
}

#[test]
fn test_padded_tag_is_rejected() {
    let (compact, supplier) = a256kw_token();
    assert!(matches!(
        jwe::decode(&format!("{compact}="), &supplier),
        Err(JoseError::Format(_))
    ));
}

#[test]
fn test_tampered_rsa_key_fails_authentication() {
    let key = KeyCodec::rsa_oaep_pair(RSA_KEY.to_public_key(), RSA_KEY.clone());
    let content = ContentCodec::generate(ContentAlgorithm::A192CbcHs384);
    let supplier = supplier(&key, &content);
    let compact = builder().encrypted(key, content).to_compact().unwrap();
    assert!(matches!(
        jwe::decode(&flip_segment(&compact, 1), &supplier),
        Err(JoseError::Authentication)
    ));
}

#[test]
fn test_direct_with_other_content_key_fails_authentication() {
    let content = ContentCodec::generate(ContentAlgorithm::A128CbcHs256);
    let compact = builder()
        .encrypted(KeyCodec::direct(), content)
        .to_compact()
        .unwrap();
    let other = FixedKey::from_content(&ContentCodec::generate(ContentAlgorithm::A128CbcHs256));
    assert!(matches!(
        jwe::decode(&compact, &other),
        Err(JoseError::Authentication)
    ));
}

#[test]
fn test_missing_key_is_reported() {
    let (compact, _) = a256kw_token();
    let nothing = |_: &cryypt_jose::Document, _: cryypt_jose::KeyKind| -> Option<KeyMaterial> {
        None
    };
    assert!(matches!(
        jwe::decode(&compact, &nothing),
        Err(JoseError::MissingKey(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_round_trips() {
    let key = KeyCodec::a128kw(AesKey::new(vec![0x44; 16])).unwrap();
    let supplier: Arc<dyn KeySupplier> = Arc::new(FixedKey::from_key_codec(&key).unwrap());

    let mut handles = Vec::new();
    for n in 0..16 {
        let key = key.clone();
        let supplier = Arc::clone(&supplier);
        handles.push(tokio::task::spawn_blocking(move || {
            let compact = TokenBuilder::new()
                .with_claim("n", n)
                .encrypted(key, ContentCodec::generate(ContentAlgorithm::A128CbcHs256))
                .to_compact()
                .unwrap();
            let token = jwe::decode(&compact, supplier.as_ref()).unwrap();
            token.claim_as_string("n")
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), Some(n.to_string()));
    }
}
