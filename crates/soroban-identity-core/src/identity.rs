/// Identity records held by the registry contract
use crate::builder::ContractArg;
use crate::codec::CodecError;
use crate::types::{Literal, LiteralMap};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const REGISTER_IDENTITY: &str = "register_identity";
pub const VERIFY_IDENTITY: &str = "verify_identity";
pub const GET_IDENTITY: &str = "get_identity";

/// Fields submitted when registering an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRegistration {
    pub name: String,
    pub country: String,
    pub doc_type: String,
    pub doc_hash: String,
}

impl IdentityRegistration {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        doc_type: impl Into<String>,
        doc_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            doc_type: doc_type.into(),
            doc_hash: doc_hash.into(),
        }
    }

    /// Registration whose `doc_hash` is the SHA-256 fingerprint of `document`
    pub fn with_document(
        name: impl Into<String>,
        country: impl Into<String>,
        doc_type: impl Into<String>,
        document: &[u8],
    ) -> Self {
        Self::new(name, country, doc_type, document_fingerprint(document))
    }

    /// `register_identity(user, name, country, doc_type, doc_hash)` arguments
    pub fn to_args(&self, user: &str) -> Vec<ContractArg> {
        vec![
            ContractArg::address(user),
            ContractArg::string(&self.name),
            ContractArg::string(&self.country),
            ContractArg::string(&self.doc_type),
            ContractArg::string(&self.doc_hash),
        ]
    }
}

/// Lowercase hex SHA-256 of a supporting document
pub fn document_fingerprint(document: &[u8]) -> String {
    hex::encode(Sha256::digest(document))
}

/// Read-only snapshot of one registry entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub name: Option<String>,
    pub country: Option<String>,
    pub doc_type: Option<String>,
    pub doc_hash: Option<String>,
    pub verified: bool,
}

impl IdentityRecord {
    /// Build a record from the decoded `get_identity` return value.
    ///
    /// Fields that are missing or not text stay `None`; only a payload that
    /// is not a map at all is rejected.
    pub fn from_literal(literal: &Literal) -> Result<Self, CodecError> {
        let map = literal.as_map().ok_or_else(|| {
            CodecError::UnsupportedVariant(format!("expected an identity map, got {}", literal))
        })?;

        Ok(Self {
            name: text(map, "name"),
            country: text(map, "country"),
            doc_type: text(map, "doc_type"),
            doc_hash: text(map, "doc_hash"),
            verified: flag(map, "verified"),
        })
    }
}

fn text(map: &LiteralMap, key: &str) -> Option<String> {
    map.get(key).and_then(Literal::as_str).map(str::to_string)
}

// The contract stores the flag as the text "true" / "false".
fn flag(map: &LiteralMap, key: &str) -> bool {
    match map.get(key) {
        Some(Literal::Bool(b)) => *b,
        Some(Literal::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Outcome of a `get_identity` query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "identity", rename_all = "snake_case")]
pub enum IdentityLookup {
    Found(IdentityRecord),
    NotFound,
}

impl IdentityLookup {
    pub fn found(&self) -> Option<&IdentityRecord> {
        match self {
            IdentityLookup::Found(record) => Some(record),
            IdentityLookup::NotFound => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_map(entries: &[(&str, Literal)]) -> Literal {
        Literal::Map(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_record_from_contract_map() {
        let literal = identity_map(&[
            ("name", "Maria".into()),
            ("country", "MX".into()),
            ("doc_type", "selfie".into()),
            ("doc_hash", "1234567890".into()),
            ("verified", "true".into()),
        ]);

        let record = IdentityRecord::from_literal(&literal).unwrap();
        assert_eq!(record.name.as_deref(), Some("Maria"));
        assert_eq!(record.country.as_deref(), Some("MX"));
        assert_eq!(record.doc_type.as_deref(), Some("selfie"));
        assert_eq!(record.doc_hash.as_deref(), Some("1234567890"));
        assert!(record.verified);
    }

    #[test]
    fn test_record_keeps_partial_fields() {
        let literal = identity_map(&[("name", "Maria".into()), ("verified", Literal::Bool(false))]);

        let record = IdentityRecord::from_literal(&literal).unwrap();
        assert_eq!(record.name.as_deref(), Some("Maria"));
        assert_eq!(record.country, None);
        assert!(!record.verified);
    }

    #[test]
    fn test_record_rejects_non_map() {
        let result = IdentityRecord::from_literal(&Literal::U32(3));
        assert!(matches!(result, Err(CodecError::UnsupportedVariant(_))));
    }

    #[test]
    fn test_document_fingerprint() {
        assert_eq!(
            document_fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let reg = IdentityRegistration::with_document("Maria", "MX", "passport", b"abc");
        assert_eq!(reg.doc_hash.len(), 64);
    }
}
