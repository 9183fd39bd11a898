//! Structured header and payload documents
//!
//! Headers and payloads are ordered string-keyed JSON objects. Insertion order
//! is kept so that re-serializing a parsed token reproduces its fields in the
//! same order.

use crate::error::{JoseError, JoseResult};
use serde_json::Value;

/// Ordered string-keyed map of JSON values
pub type Document = serde_json::Map<String, Value>;

/// Serialize a document to minified JSON bytes
pub fn encode_document(document: &Document) -> JoseResult<Vec<u8>> {
    serde_json::to_vec(document).map_err(|e| JoseError::Serialization(e.to_string()))
}

/// Parse JSON bytes into a document; anything but an object is rejected
pub fn decode_document(bytes: &[u8]) -> JoseResult<Document> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(JoseError::format("document is not a JSON object")),
        Err(e) => Err(JoseError::format(format!("undecodable document: {e}"))),
    }
}

/// Typed accessors over a [`Document`]
pub trait DocumentExt {
    /// String value of `key`, if present and a string
    fn get_str(&self, key: &str) -> Option<&str>;

    /// Integer value of `key`, if present and representable as `i64`
    fn get_i64(&self, key: &str) -> Option<i64>;

    /// True when `key` holds a string
    fn has_string(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Copy of this document with `key` set to `value`
    #[must_use]
    fn with(&self, key: &str, value: impl Into<Value>) -> Document;
}

impl DocumentExt for Document {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    fn with(&self, key: &str, value: impl Into<Value>) -> Document {
        let mut out = self.clone();
        out.insert(key.to_string(), value.into());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_keeps_insertion_order() {
        let mut doc = Document::new();
        doc.insert("typ".into(), json!("JWT"));
        doc.insert("alg".into(), json!("HS256"));
        assert_eq!(encode_document(&doc).unwrap(), br#"{"typ":"JWT","alg":"HS256"}"#);
    }

    #[test]
    fn test_with_replaces_in_place() {
        let mut doc = Document::new();
        doc.insert("alg".into(), json!("none"));
        doc.insert("typ".into(), json!("JWT"));
        let updated = doc.with("alg", "HS512");
        assert_eq!(encode_document(&updated).unwrap(), br#"{"alg":"HS512","typ":"JWT"}"#);
        assert_eq!(doc.get_str("alg"), Some("none"));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(matches!(decode_document(b"[1,2]"), Err(JoseError::Format(_))));
        assert!(matches!(decode_document(b"{"), Err(JoseError::Format(_))));
    }

    #[test]
    fn test_typed_accessors() {
        let doc = decode_document(br#"{"iss":"test","iat":1700000000,"flag":true}"#).unwrap();
        assert_eq!(doc.get_str("iss"), Some("test"));
        assert_eq!(doc.get_i64("iat"), Some(1_700_000_000));
        assert!(doc.has_string("iss"));
        assert!(!doc.has_string("flag"));
    }
}
