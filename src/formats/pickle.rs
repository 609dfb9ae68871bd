// Python pickle reader for the serialized bigram/unigram lists that ship
// with published replication packages.
//
// Decoded values are mapped onto JSON so they can be printed, diffed and
// turned into lexicon files without any Python around.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value as Json};
use serde_pickle::{DeOptions, HashableValue, Value};

/// Decode a pickle file into JSON.
pub fn read_pickle(path: &Path) -> Result<Json> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_pickle(&bytes).with_context(|| format!("Failed to decode pickle {}", path.display()))
}

/// Decode pickle bytes into JSON.
///
/// Class instances (pandas frames, numpy arrays) can't be rebuilt outside
/// Python; their globals decode as `null` rather than aborting the load.
pub fn decode_pickle(bytes: &[u8]) -> Result<Json> {
    let options = DeOptions::new().replace_unresolved_globals();
    let value = serde_pickle::value_from_slice(bytes, options)?;
    Ok(to_json(value))
}

fn to_json(value: Value) -> Json {
    match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::I64(i) => Json::from(i),
        Value::Int(big) => Json::String(big.to_string()),
        Value::F64(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Bytes(b) => bytes_to_json(b),
        Value::String(s) => Json::String(s),
        Value::List(items) | Value::Tuple(items) => {
            Json::Array(items.into_iter().map(to_json).collect())
        }
        Value::Set(items) | Value::FrozenSet(items) => Json::Array(
            items
                .into_iter()
                .map(|h| to_json(h.into_value()))
                .collect(),
        ),
        Value::Dict(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(key_string(k), to_json(v));
            }
            Json::Object(map)
        }
    }
}

fn bytes_to_json(bytes: Vec<u8>) -> Json {
    match String::from_utf8(bytes) {
        Ok(s) => Json::String(s),
        Err(e) => Json::Array(e.into_bytes().into_iter().map(Json::from).collect()),
    }
}

/// Dict keys become strings: text stays as-is, tuples join with a space
/// (bigram keys), anything else uses its JSON rendering.
fn key_string(key: HashableValue) -> String {
    match to_json(key.into_value()) {
        Json::String(s) => s,
        Json::Array(parts) if parts.iter().all(Json::is_string) => parts
            .iter()
            .filter_map(Json::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Flatten decoded content into lexicon terms.
///
/// Strings are terms; an array made only of strings directly inside a
/// collection (a bigram tuple) becomes one space-joined term; dicts
/// contribute their keys. Numbers and nulls are skipped.
pub fn terms(value: &Json) -> Vec<String> {
    let mut out = Vec::new();
    collect_terms(value, &mut out);
    out
}

fn collect_terms(value: &Json, out: &mut Vec<String>) {
    match value {
        Json::String(s) => out.push(s.clone()),
        Json::Array(items) => {
            for item in items {
                match item {
                    Json::Array(parts) if !parts.is_empty() && parts.iter().all(Json::is_string) => {
                        let joined: Vec<&str> = parts.iter().filter_map(Json::as_str).collect();
                        out.push(joined.join(" "));
                    }
                    other => collect_terms(other, out),
                }
            }
        }
        Json::Object(map) => out.extend(map.keys().cloned()),
        _ => {}
    }
}
