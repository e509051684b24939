//! # mdoc Decoding
//!
//! Decodes the CBOR-encoded mobile-document credential format far enough to
//! display its namespaces. Issuer-signature and device-auth verification
//! are not implemented for this format.

use base64ct::{Base64UrlUnpadded, Encoding};
use ciborium::Value as Cbor;
use serde_json::{Map, Value};
use thiserror::Error;

/// mdoc decoding errors.
#[derive(Debug, Error)]
pub enum MdocError {
    /// The credential is not valid base64url.
    #[error("invalid base64url encoding: {0}")]
    Base64(String),

    /// The credential is not valid CBOR.
    #[error("invalid CBOR encoding: {0}")]
    Cbor(String),
}

/// Decode a base64url CBOR credential into its raw CBOR value.
///
/// # Errors
///
/// Returns `MdocError` when the token is not base64url-wrapped CBOR.
pub fn decode_credential(encoded: &str) -> Result<Cbor, MdocError> {
    let bytes = Base64UrlUnpadded::decode_vec(encoded.trim_end_matches('='))
        .map_err(|e| MdocError::Base64(e.to_string()))?;
    ciborium::de::from_reader(bytes.as_slice()).map_err(|e| MdocError::Cbor(e.to_string()))
}

/// Decode all issuer-signed namespaces of an mdoc for display: each
/// namespace entry is an embedded (tag 24) CBOR item which is decoded in
/// turn and converted to JSON.
///
/// # Errors
///
/// Returns `MdocError` when the outer document structure cannot be decoded.
pub fn decode_namespaces(encoded: &str) -> Result<Value, MdocError> {
    let root = decode_credential(encoded)?;
    let mut decoded = Map::new();

    let Some(documents) = map_get(&root, "documents").and_then(Cbor::as_array) else {
        return Ok(Value::Object(decoded));
    };

    for document in documents {
        let namespaces = map_get(document, "issuerSigned")
            .and_then(|is| map_get(is, "nameSpaces"))
            .and_then(Cbor::as_map);
        let Some(namespaces) = namespaces else {
            continue;
        };

        for (name, entries) in namespaces {
            let Some(name) = name.as_text() else {
                continue;
            };
            let items: Vec<Value> = entries
                .as_array()
                .map(|entries| entries.iter().map(decode_entry).collect())
                .unwrap_or_default();
            decoded.insert(name.to_string(), Value::Array(items));
        }
    }

    Ok(Value::Object(decoded))
}

// A namespace entry is conventionally tag 24 wrapping the CBOR bytes of the
// item; tolerate bare byte strings and already-decoded items.
fn decode_entry(entry: &Cbor) -> Value {
    let bytes = match entry {
        Cbor::Tag(24, inner) => inner.as_bytes(),
        Cbor::Bytes(bytes) => Some(bytes),
        other => return cbor_to_json(other),
    };
    let Some(bytes) = bytes else {
        return cbor_to_json(entry);
    };
    ciborium::de::from_reader::<Cbor, _>(bytes.as_slice())
        .map_or(Value::Null, |inner| cbor_to_json(&inner))
}

/// Lossy conversion of a CBOR value to JSON: byte strings become base64url
/// text, non-text map keys are stringified.
#[must_use]
pub fn cbor_to_json(value: &Cbor) -> Value {
    match value {
        Cbor::Integer(i) => i64::try_from(*i).map_or(Value::Null, Value::from),
        Cbor::Bytes(bytes) => Value::String(Base64UrlUnpadded::encode_string(bytes)),
        Cbor::Text(s) => Value::String(s.clone()),
        Cbor::Bool(b) => Value::Bool(*b),
        Cbor::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Cbor::Array(items) => Value::Array(items.iter().map(cbor_to_json).collect()),
        Cbor::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                let key = k.as_text().map_or_else(|| format!("{k:?}"), ToString::to_string);
                map.insert(key, cbor_to_json(v));
            }
            Value::Object(map)
        }
        Cbor::Tag(_, inner) => cbor_to_json(inner),
        _ => Value::Null,
    }
}

fn map_get<'a>(value: &'a Cbor, key: &str) -> Option<&'a Cbor> {
    value.as_map()?.iter().find(|(k, _)| k.as_text() == Some(key)).map(|(_, v)| v)
}
