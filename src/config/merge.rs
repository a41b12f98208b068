//! Layer merging
//!
//! Later layers win. Tables merge key by key, arrays are replaced wholesale
//! (a `--source` on the command line replaces the file's `[[sources]]`), and
//! any other value overrides.

use serde_json::Value;

/// Merge `overlay` into `base` in place.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Merge layers in precedence order (first is lowest).
pub fn merge_layers<I>(layers: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    let mut merged = Value::Null;
    for layer in layers {
        merge_into(&mut merged, layer);
    }
    merged
}
