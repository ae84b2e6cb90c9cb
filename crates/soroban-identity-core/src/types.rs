/// Shared types for the registry bridge
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use stellar_xdr::curr::ScVal;

/// Application-level value decoded from a contract return value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Map(LiteralMap),
    Raw(ScVal), // variants the codec does not model, passed through untouched
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&LiteralMap> {
        match self {
            Literal::Map(m) => Some(m),
            _ => None,
        }
    }

    /// String form used for map keys. Maps and raw values have none.
    pub fn coerce_key(&self) -> Option<String> {
        match self {
            Literal::String(s) => Some(s.clone()),
            Literal::Bool(b) => Some(b.to_string()),
            Literal::I32(n) => Some(n.to_string()),
            Literal::U32(n) => Some(n.to_string()),
            Literal::I64(n) => Some(n.to_string()),
            Literal::U64(n) => Some(n.to_string()),
            Literal::Map(_) | Literal::Raw(_) => None,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::I32(n) => write!(f, "{}", n),
            Literal::U32(n) => write!(f, "{}", n),
            Literal::I64(n) => write!(f, "{}", n),
            Literal::U64(n) => write!(f, "{}", n),
            Literal::Map(m) => write!(f, "{{...({} entries)}}", m.len()),
            Literal::Raw(v) => write!(f, "raw({:?})", v.discriminant()),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

/// String-keyed mapping that keeps keys in first-insertion order.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiteralMap {
    entries: Vec<(String, Literal)>,
}

impl LiteralMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: Literal) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Literal)> for LiteralMap {
    fn from_iter<I: IntoIterator<Item = (String, Literal)>>(iter: I) -> Self {
        let mut map = LiteralMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for LiteralMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Account state needed to build a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub sequence: i64,
}

/// Response from Stellar RPC `simulateTransaction`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transaction_data: Option<String>,
    #[serde(default)]
    pub min_resource_fee: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<SimulateHostFunctionResult>>,
    #[serde(default)]
    pub latest_ledger: u32,
    #[serde(default)]
    pub restore_preamble: Option<serde_json::Value>,
}

impl SimulateResponse {
    /// Return value of the first host function, if the simulation produced one
    pub fn retval_xdr(&self) -> Option<&str> {
        self.results
            .as_ref()
            .and_then(|r| r.first())
            .and_then(|r| r.xdr.as_deref())
            .filter(|x| !x.is_empty())
    }

    /// Authorization entries recorded for the first host function
    pub fn auth_xdr(&self) -> &[String] {
        self.results
            .as_ref()
            .and_then(|r| r.first())
            .and_then(|r| r.auth.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulateHostFunctionResult {
    #[serde(default)]
    pub auth: Option<Vec<String>>,
    #[serde(default)]
    pub xdr: Option<String>,
}

/// Status reported by `sendTransaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    Pending,
    Duplicate,
    TryAgainLater,
    Error,
}

impl std::fmt::Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendStatus::Pending => write!(f, "PENDING"),
            SendStatus::Duplicate => write!(f, "DUPLICATE"),
            SendStatus::TryAgainLater => write!(f, "TRY_AGAIN_LATER"),
            SendStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Response from Stellar RPC `sendTransaction`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionResponse {
    pub status: SendStatus,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub latest_ledger: u32,
    #[serde(default)]
    pub error_result_xdr: Option<String>,
}

/// Acknowledgement that the network accepted a signed envelope for processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub hash: String,
    pub status: SendStatus,
    pub latest_ledger: u32,
}

/// Response from Stellar RPC `getLatestLedger`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLedger {
    pub sequence: u32,
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub id: String,
}
