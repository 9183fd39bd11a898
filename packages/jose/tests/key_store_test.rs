//! Issuing and reading tokens with keys resolved from stores

use cryypt_jose::{
    AesKey, ChainedSupplier, ContentAlgorithm, ContentCodec, FileKeyStore, FixedKey, HmacKey,
    JoseError, Jwt, KeyCodec, KeyKind, KeyMaterial, KeyStore, MemoryKeyStore, TokenBuilder,
    read_any,
};
use rsa::RsaPrivateKey;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn file_store() -> (TempDir, FileKeyStore) {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::new(dir.path());
    (dir, store)
}

#[test]
fn test_signed_token_through_file_store() {
    let (_dir, store) = file_store();
    store
        .set("signer", KeyMaterial::Hmac(HmacKey::new(vec![5u8; 64])))
        .unwrap();

    let token = TokenBuilder::new()
        .issued_by("test")
        .build_from_store(&store, "signer", KeyKind::Hmac)
        .unwrap();
    assert_eq!(token.header().get("alg").and_then(|v| v.as_str()), Some("HS512"));
    let compact = token.to_compact().unwrap();

    let reopened = FileKeyStore::new(store.folder());
    let parsed = read_any(&compact, &reopened.supplier()).unwrap();
    assert_eq!(parsed.issuer(), Some("test"));
    assert_eq!(parsed.header().get("kid").and_then(|v| v.as_str()), Some("signer"));
}

#[test]
fn test_encrypted_token_through_file_store() {
    let (_dir, store) = file_store();
    store
        .set("wrap", KeyMaterial::Aes(AesKey::new(vec![7u8; 32])))
        .unwrap();

    let compact = TokenBuilder::new()
        .with_claim("scope", "read")
        .build_from_store(&store, "wrap", KeyKind::Aes)
        .unwrap()
        .to_compact()
        .unwrap();
    assert_eq!(compact.matches('.').count(), 4);

    let parsed = read_any(&compact, &store.supplier()).unwrap();
    assert!(parsed.is_encrypted());
    assert_eq!(parsed.claim_as_string("scope").as_deref(), Some("read"));
}

#[test]
fn test_rsa_pair_through_file_store() {
    let (dir, store) = file_store();
    let private = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024).unwrap();
    store
        .set("service", KeyMaterial::RsaPublic(private.to_public_key()))
        .unwrap();
    store
        .set("service", KeyMaterial::RsaPrivate(private))
        .unwrap();
    assert!(dir.path().join("service.pub").is_file());
    assert!(dir.path().join("service.rsa").is_file());

    let compact = TokenBuilder::new()
        .issued_by("test")
        .build_from_store(&store, "service", KeyKind::RsaPublic)
        .unwrap()
        .to_compact()
        .unwrap();

    let reopened = FileKeyStore::new(dir.path());
    let parsed = read_any(&compact, &reopened.supplier()).unwrap();
    assert_eq!(parsed.header().get("alg").and_then(|v| v.as_str()), Some("RSA-OAEP"));
    assert_eq!(parsed.issuer(), Some("test"));
}

#[test]
fn test_missing_store_key() {
    let (_dir, store) = file_store();
    let err = TokenBuilder::new()
        .build_from_store(&store, "absent", KeyKind::Hmac)
        .unwrap_err();
    assert!(matches!(err, JoseError::MissingKey(_)));
}

#[test]
fn test_unlisted_kind_is_not_stored() {
    let dir = TempDir::new().unwrap();
    let store = FileKeyStore::with_extensions(
        dir.path(),
        HashMap::from([(KeyKind::Hmac, "secret".to_string())]),
    );
    assert!(
        store
            .set("k", KeyMaterial::Aes(AesKey::new(vec![1u8; 16])))
            .is_err()
    );
    store
        .set("k", KeyMaterial::Hmac(HmacKey::new(vec![1u8; 32])))
        .unwrap();
    assert!(dir.path().join("k.secret").is_file());
}

#[test]
fn test_clear_removes_file_and_cache() {
    let (dir, store) = file_store();
    store
        .set("gone", KeyMaterial::Hmac(HmacKey::new(vec![3u8; 32])))
        .unwrap();
    assert!(store.get("gone", KeyKind::Hmac).is_some());

    store.clear("gone", KeyKind::Hmac).unwrap();
    assert!(store.get("gone", KeyKind::Hmac).is_none());
    assert!(!dir.path().join("gone.key").exists());
    store.clear("gone", KeyKind::Hmac).unwrap();
}

#[test]
fn test_chained_suppliers_fall_through() {
    let memory = Arc::new(MemoryKeyStore::new());
    memory
        .set("m", KeyMaterial::Hmac(HmacKey::new(vec![8u8; 32])))
        .unwrap();
    let fallback = HmacKey::new(vec![2u8; 32]);

    let compact = TokenBuilder::new()
        .issued_by("test")
        .build(KeyMaterial::Hmac(fallback.clone()), Some("other"))
        .unwrap()
        .to_compact()
        .unwrap();

    let chain = ChainedSupplier::new()
        .or(cryypt_jose::StoreSupplier::new(Arc::clone(&memory)))
        .or(FixedKey::new(KeyMaterial::Hmac(fallback)));
    let parsed = read_any(&compact, &chain).unwrap();
    assert_eq!(parsed.issuer(), Some("test"));
}

#[test]
fn test_direct_token_falls_past_file_store() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileKeyStore::new(dir.path()));
    let content = ContentCodec::generate(ContentAlgorithm::A128CbcHs256);
    let compact = TokenBuilder::new()
        .issued_by("test")
        .encrypted_with_kid(KeyCodec::direct(), content.clone(), "cek")
        .to_compact()
        .unwrap();

    let chain = ChainedSupplier::new()
        .or(cryypt_jose::StoreSupplier::new(Arc::clone(&store)))
        .or(FixedKey::from_content(&content));
    let parsed = read_any(&compact, &chain).unwrap();
    assert_eq!(parsed.issuer(), Some("test"));
    assert!(
        store
            .get("cek", KeyKind::Content(ContentAlgorithm::A128CbcHs256))
            .is_none()
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
