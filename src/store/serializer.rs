//! Serializer Module
//!
//! Turns values into string payloads and back.
//!
//! Encoding tries an ordered list of strategies and keeps the first that
//! applies: canonical JSON, then raw passthrough. Canonical output is pure
//! ASCII, so a payload can be cut at any byte offset without splitting a
//! character.

use std::io::{self, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A value held by the chunked store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// Structured data with a canonical JSON encoding
    Json(Value),
    /// Raw text stored as-is in a single slot, without JSON framing.
    ///
    /// Reads cannot tell the layouts apart: text that happens to parse as
    /// JSON (`"123"`, `"true"`) comes back as `Json`, not `Opaque`.
    Opaque(String),
}

impl CacheValue {
    /// Converts any serializable value into its structured form.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(CacheValue::Json)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Converts the structured form back into a typed value.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            CacheValue::Json(value) => value,
            CacheValue::Opaque(raw) => Value::String(raw),
        };
        serde_json::from_value(value).map_err(|e| CacheError::Parse {
            key: String::new(),
            reason: e.to_string(),
        })
    }

    /// JSON view of the value; opaque text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            CacheValue::Json(value) => value,
            CacheValue::Opaque(raw) => Value::String(raw),
        }
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        CacheValue::Json(value)
    }
}

// == Payload ==
/// The serialized form of a value, tagged with how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// ASCII-only JSON; may be split into chunks
    Canonical(String),
    /// Raw text; always written to a single slot
    Passthrough(String),
}

impl Payload {
    pub fn as_str(&self) -> &str {
        match self {
            Payload::Canonical(s) | Payload::Passthrough(s) => s,
        }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

// == Strategies ==
type Strategy = fn(&CacheValue) -> Option<Payload>;

const STRATEGIES: [(&str, Strategy); 2] = [
    ("canonical", canonical),
    ("passthrough", passthrough),
];

/// Applies to structured values whose encoding succeeds.
fn canonical(value: &CacheValue) -> Option<Payload> {
    match value {
        CacheValue::Json(json) => encode_canonical(json).ok().map(Payload::Canonical),
        CacheValue::Opaque(_) => None,
    }
}

/// Applies to opaque text, stored unchanged.
fn passthrough(value: &CacheValue) -> Option<Payload> {
    match value {
        CacheValue::Opaque(raw) => Some(Payload::Passthrough(raw.clone())),
        CacheValue::Json(_) => None,
    }
}

/// Serializes a value with the first applicable strategy.
pub fn serialize(value: &CacheValue) -> Result<Payload> {
    for (name, strategy) in STRATEGIES {
        if let Some(payload) = strategy(value) {
            debug!("serialized {} bytes via {} strategy", payload.len(), name);
            return Ok(payload);
        }
    }
    Err(CacheError::Serialization(
        "no serialization strategy applies".to_string(),
    ))
}

/// Decodes a raw backend value, returning it unchanged when it is not JSON.
pub fn deserialize(raw: String) -> CacheValue {
    match serde_json::from_str(&raw) {
        Ok(value) => CacheValue::Json(value),
        Err(_) => CacheValue::Opaque(raw),
    }
}

/// Strict decode for reconstructed chunked payloads, which are always canonical.
pub fn decode_canonical(key: &str, raw: &str) -> Result<CacheValue> {
    serde_json::from_str(raw)
        .map(CacheValue::Json)
        .map_err(|e| CacheError::Parse {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encodes `value` as JSON with every non-ASCII character escaped.
pub fn encode_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| CacheError::Serialization(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| CacheError::Serialization(e.to_string()))
}

// == ASCII Formatter ==
/// Compact JSON formatter that escapes non-ASCII characters as `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }

        writer.write_all(&bytes[start..])
    }
}
