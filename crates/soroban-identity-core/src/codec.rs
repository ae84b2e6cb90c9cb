/// Typed-value codec for contract arguments and return values
use crate::types::{Literal, LiteralMap};
use base64::Engine;
use stellar_xdr::curr::{Limits, ReadXdr, ScMap, ScMapEntry, ScString, ScSymbol, ScVal, StringM, WriteXdr};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Failed to decode base64 XDR: {0}")]
    Base64(String),
    #[error("Failed to parse XDR: {0}")]
    Xdr(String),
    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),
}

/// Decode a base64-encoded XDR ScVal into a literal
pub fn decode_base64(xdr_base64: &str) -> Result<Literal, CodecError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(xdr_base64)
        .map_err(|e| CodecError::Base64(e.to_string()))?;

    decode_xdr(&bytes)
}

/// Decode XDR wire bytes (length-prefixed strings) into a literal
pub fn decode_xdr(bytes: &[u8]) -> Result<Literal, CodecError> {
    let scval = ScVal::from_xdr(bytes, Limits::none()).map_err(|e| CodecError::Xdr(e.to_string()))?;

    Ok(decode(&scval))
}

/// Decode an in-memory ScVal into a literal.
///
/// Never fails: variants without a literal form come back as
/// [`Literal::Raw`], and map entries whose key has no string form are dropped.
pub fn decode(value: &ScVal) -> Literal {
    match value {
        ScVal::String(s) => Literal::String(utf8(s.0.as_slice())),
        ScVal::Symbol(s) => Literal::String(utf8(s.0.as_slice())),
        ScVal::Bool(b) => Literal::Bool(*b),
        ScVal::I32(n) => Literal::I32(*n),
        ScVal::U32(n) => Literal::U32(*n),
        ScVal::I64(n) => Literal::I64(*n),
        ScVal::U64(n) => Literal::U64(*n),
        ScVal::Map(Some(map)) => Literal::Map(decode_map(map)),
        ScVal::Map(None) => Literal::Map(LiteralMap::new()),
        other => Literal::Raw(other.clone()),
    }
}

fn decode_map(map: &ScMap) -> LiteralMap {
    let mut decoded = LiteralMap::new();

    for (index, entry) in map.0.iter().enumerate() {
        let key = decode(&entry.key);
        let Some(key) = key.coerce_key() else {
            warn!(index, key_type = entry.key.name(), "Skipping map entry whose key is not string-like");
            continue;
        };

        decoded.insert(key, decode(&entry.val));
    }

    decoded
}

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

/// Encode a literal as an ScVal.
///
/// Map keys are written as symbols when they are valid symbols and as
/// strings otherwise. Raw values are written back unchanged.
pub fn encode(literal: &Literal) -> Result<ScVal, CodecError> {
    match literal {
        Literal::String(s) => Ok(ScVal::String(sc_string(s)?)),
        Literal::Bool(b) => Ok(ScVal::Bool(*b)),
        Literal::I32(n) => Ok(ScVal::I32(*n)),
        Literal::U32(n) => Ok(ScVal::U32(*n)),
        Literal::I64(n) => Ok(ScVal::I64(*n)),
        Literal::U64(n) => Ok(ScVal::U64(*n)),
        Literal::Map(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (k, v) in map.iter() {
                entries.push(ScMapEntry {
                    key: map_key(k)?,
                    val: encode(v)?,
                });
            }
            let entries = entries
                .try_into()
                .map_err(|e: stellar_xdr::curr::Error| CodecError::Xdr(e.to_string()))?;
            Ok(ScVal::Map(Some(ScMap(entries))))
        }
        Literal::Raw(v) => Ok(v.clone()),
    }
}

/// Encode a literal straight to base64 XDR
pub fn encode_base64(literal: &Literal) -> Result<String, CodecError> {
    let bytes = encode(literal)?
        .to_xdr(Limits::none())
        .map_err(|e| CodecError::Xdr(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

pub(crate) fn sc_string(s: &str) -> Result<ScString, CodecError> {
    let inner: StringM = s.try_into().map_err(|e: stellar_xdr::curr::Error| CodecError::Xdr(e.to_string()))?;
    Ok(ScString(inner))
}

pub(crate) fn sc_symbol(s: &str) -> Result<ScSymbol, CodecError> {
    if !is_symbol(s) {
        return Err(CodecError::UnsupportedVariant(format!("'{}' is not a valid symbol", s)));
    }
    let inner: StringM<32> = s.try_into().map_err(|e: stellar_xdr::curr::Error| CodecError::Xdr(e.to_string()))?;
    Ok(ScSymbol(inner))
}

fn map_key(key: &str) -> Result<ScVal, CodecError> {
    if is_symbol(key) {
        Ok(ScVal::Symbol(sc_symbol(key)?))
    } else {
        Ok(ScVal::String(sc_string(key)?))
    }
}

/// Symbols are at most 32 characters from `[a-zA-Z0-9_]`
fn is_symbol(s: &str) -> bool {
    !s.is_empty() && s.len() <= 32 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
