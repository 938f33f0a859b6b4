//! Structural value comparison and the default reconciler.
//!
//! Config values are JSON-shaped and carry no identity: two values are the
//! same iff they are structurally equal. `structural_eq` backs rollback and
//! drift detection in the engine; `reconcile` back-fills missing nested
//! fields of a partial value from a default-shaped value, so adding new
//! default fields never breaks previously stored or served values.

use serde_json::{Map, Value};

/// JSON-shaped configuration value.
pub type ConfigValue = Value;

/// Deep structural equality.
///
/// Scalars compare by value. Two objects are equal iff every key present on
/// either side exists on the other with a structurally equal value; the
/// check runs in both directions since one side may carry extra keys.
/// Arrays compare element-wise. Values of different kinds are unequal.
pub fn structural_eq(a: &ConfigValue, b: &ConfigValue) -> bool {
    match (a, b) {
        (Value::Object(ma), Value::Object(mb)) => {
            for (k, va) in ma {
                match mb.get(k) {
                    Some(vb) if structural_eq(va, vb) => {}
                    _ => return false,
                }
            }
            for k in mb.keys() {
                if !ma.contains_key(k) {
                    return false;
                }
            }
            true
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| structural_eq(x, y))
        }
        _ => a == b,
    }
}

/// Fills missing nested fields of `value` from `default`.
///
/// If either side is not an object, `value` is returned unchanged: defaults
/// cannot patch scalars. Otherwise the result contains every key of `value`
/// (recursively reconciled where the default at that key is also an object)
/// plus every key of `default` absent from `value`. Inputs are never
/// mutated.
pub fn reconcile(value: &ConfigValue, default: &ConfigValue) -> ConfigValue {
    let (Value::Object(value_map), Value::Object(default_map)) = (value, default) else {
        return value.clone();
    };

    let mut out = Map::with_capacity(value_map.len().max(default_map.len()));
    for (k, v) in value_map {
        match default_map.get(k) {
            Some(d @ Value::Object(_)) if v.is_object() => {
                out.insert(k.clone(), reconcile(v, d));
            }
            _ => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    for (k, d) in default_map {
        if !out.contains_key(k) {
            out.insert(k.clone(), d.clone());
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reconcile_scalar_passthrough() {
        assert_eq!(reconcile(&json!(5), &json!({"a": 1})), json!(5));
        assert_eq!(reconcile(&json!({"a": 1}), &json!(false)), json!({"a": 1}));
    }

    #[test]
    fn reconcile_fills_nested_defaults() {
        let value = json!({"speed": {"walk": 8}});
        let default = json!({"speed": {"walk": 16, "run": 24}, "enabled": true});
        assert_eq!(
            reconcile(&value, &default),
            json!({"speed": {"walk": 8, "run": 24}, "enabled": true})
        );
    }

    #[test]
    fn reconcile_keeps_extra_value_keys() {
        let value = json!({"x": 1, "extra": "kept"});
        let default = json!({"x": 0});
        assert_eq!(reconcile(&value, &default), json!({"x": 1, "extra": "kept"}));
    }

    #[test]
    fn structural_eq_detects_missing_keys_both_ways() {
        let a = json!({"x": 1});
        let b = json!({"x": 1, "y": 2});
        assert!(!structural_eq(&a, &b));
        assert!(!structural_eq(&b, &a));
    }
}
