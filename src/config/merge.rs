//! Field-by-field merging of configuration tiers.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// Objects merge key by key; any other value in `overlay` replaces `base`
/// outright. A `null` overlay means "not specified" and keeps `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold [`deep_merge`] over tiers, lowest priority first.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_keys_override_individually() {
        let base = json!({"server": {"host": "127.0.0.1", "port": 3030}});
        let overlay = json!({"server": {"port": 8080}});

        assert_eq!(
            deep_merge(base, overlay),
            json!({"server": {"host": "127.0.0.1", "port": 8080}})
        );
    }

    #[test]
    fn null_overlay_keeps_base() {
        let base = json!({"session": {"ttl_hours": 24}});
        assert_eq!(deep_merge(base.clone(), Value::Null), base);
        assert_eq!(
            deep_merge(base.clone(), json!({"session": {"ttl_hours": null}})),
            base
        );
    }

    #[test]
    fn later_tiers_win() {
        let merged = deep_merge_all([
            json!({"server": {"port": 1}}),
            json!({"server": {"port": 2}}),
            json!({"server": {"port": 3, "host": "::"}}),
        ]);
        assert_eq!(merged, json!({"server": {"port": 3, "host": "::"}}));
    }
}
