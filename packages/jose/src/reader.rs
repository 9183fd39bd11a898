//! Dispatch between JWS and JWE by inspecting the header

use crate::document::{DocumentExt, decode_document};
use crate::encoding::decode_segment;
use crate::error::{JoseError, JoseResult};
use crate::supplier::KeySupplier;
use crate::token::Token;
use crate::{jwe, jws};

/// Parse a compact token of either kind.
///
/// A header with a string `enc` selects JWE, anything else JWS.
pub fn read_any(input: &str, supplier: &dyn KeySupplier) -> JoseResult<Token> {
    let Some((header_b64, _)) = input.split_once('.') else {
        return Err(JoseError::format("token has no header segment"));
    };
    let header = decode_document(&decode_segment(header_b64, "header")?)?;
    if header.has_string("enc") {
        jwe::decode(input, supplier).map(Token::Encrypted)
    } else {
        jws::decode(input, supplier).map(Token::Signed)
    }
}
