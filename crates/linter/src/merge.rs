//! Ordered deep merge for option values.

use serde_json::{Map, Value};

/// Merge `layer` onto `base` in place.
///
/// Object fields merge recursively; arrays and scalars replace. This is the
/// one merge used everywhere options meet: defaults under configured values,
/// and target option layers in order.
pub fn deep_merge(base: &mut Value, layer: &Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, other) => *slot = other.clone(),
    }
}

/// Merge layers left to right; later layers win.
#[must_use]
pub fn merge_layers(layers: &[Value]) -> Value {
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}
