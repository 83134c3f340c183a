//! Deterministic witness identifiers for diagnostics and conflicts.
//!
//! Two runs that observe the same failure produce the same id, so reports
//! can be diffed across runs and machines.
//!
//! Algorithm:
//! 1. Build the witness key `{schema, class, law, subject, context}`
//! 2. Serialize canonically: sorted keys, no whitespace
//! 3. `"w1_" + base32hex_lower(sha256(key))`, unpadded

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Version of the witness key layout.
pub const WITNESS_SCHEMA: u32 = 1;

/// Failure classes reported by the verifier and the coherence checker.
pub mod failure_class {
    /// Two sides of a law produced different observations.
    pub const LAW_VIOLATION: &str = "law_violation";
    /// Re-running the same side on the same input gave a different trace.
    pub const REPLAY_DIVERGENCE: &str = "replay_divergence";
    pub const COMPLETE_VIEWS_DISAGREE: &str = "complete_views_disagree";
    pub const LOSSY_VIEW_CONTRADICTION: &str = "lossy_view_contradiction";
    pub const GLUE_UNDEFINED: &str = "glue_undefined";
    pub const GLUE_UNFAITHFUL: &str = "glue_unfaithful";
}

/// Witness id of a failure.
///
/// `law` names the law or sheaf checked, `subject` the agent or view pair
/// at fault, `context` whatever input reproduces it.
pub fn compute_witness_id(
    class: &str,
    law: &str,
    subject: Option<&str>,
    context: Option<&Value>,
) -> String {
    let key = witness_key(class, law, subject, context);
    let digest = Sha256::digest(canonical_json(&key).as_bytes());
    format!("w1_{}", base32hex_lower(&digest))
}

fn witness_key(class: &str, law: &str, subject: Option<&str>, context: Option<&Value>) -> Value {
    let mut key = Map::new();
    key.insert("schema".to_string(), Value::from(WITNESS_SCHEMA));
    key.insert("class".to_string(), Value::from(class));
    key.insert("law".to_string(), Value::from(law));
    key.insert(
        "subject".to_string(),
        subject.map_or(Value::Null, Value::from),
    );
    key.insert(
        "context".to_string(),
        context.cloned().unwrap_or(Value::Null),
    );
    Value::Object(key)
}

/// Compact JSON with object keys in lexicographic order at every level.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        // Scalars already print canonically: escaped strings, shortest numbers.
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// RFC 4648 base32hex, lowercase, no padding.
fn base32hex_lower(data: &[u8]) -> String {
    const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(char::from(ALPHABET[((buffer >> bits) & 0x1f) as usize]));
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(char::from(ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize]));
    }
    out
}
