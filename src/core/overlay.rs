//! Decodes daemon responses on top of pre-built defaults.
//!
//! The daemon may leave out fields the client contract requires (for example
//! per-database entries of a job that has not started yet), so its body is
//! merged into a seeded value instead of being decoded from scratch.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Overlay a daemon body onto `seed` and decode the result.
///
/// Objects merge key by key, arrays merge positionally, `null` keeps the seed.
pub fn overlay<T>(seed: &T, body: &[u8]) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let patch: Value = serde_json::from_slice(body)?;
    if !patch.is_object() {
        return Err(serde::de::Error::custom(format!(
            "expected a JSON object, found {}",
            kind_of(&patch)
        )));
    }

    let mut merged = serde_json::to_value(seed)?;
    merge(&mut merged, patch);
    serde_json::from_value(merged)
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None if !value.is_null() => {
                        target.insert(key, value);
                    }
                    None => {}
                }
            }
        }
        (Value::Array(target), Value::Array(patch)) => {
            let len = patch.len();
            for (i, value) in patch.into_iter().enumerate() {
                match target.get_mut(i) {
                    Some(existing) => merge(existing, value),
                    None => target.push(value),
                }
            }
            target.truncate(len);
        }
        (target, patch) => *target = patch,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
