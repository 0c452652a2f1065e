//! Tolerant JSON helpers for tool-produced files
//!
//! The per-browser extractors are not consistent about scalar types (a
//! timestamp may be a string or a number, a count may be quoted) and may
//! emit `null` for anything. These deserializers accept whatever is there
//! and fall back to the type's empty value instead of rejecting the record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

/// String, number or bool rendered as a string; `null` becomes empty
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Non-negative integer from a number or numeric string, else 0
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Signed integer from a number or numeric string, else 0
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Bool from a bool, a number (non-zero is true) or "true"/"1"
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

/// Optional string: absent or `null` is `None`, any other scalar is rendered
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Optional integer from a number or numeric string
pub fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Any value that fits `T`, otherwise `T::default()`
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Array field where `null` or a non-array means empty and malformed
/// elements are skipped
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(records(Value::deserialize(deserializer)?))
}

/// Like `lenient_vec`, but a malformed element becomes `T::default()` so
/// the element count and positions are preserved
pub fn lenient_vec_keep<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).unwrap_or_else(|e| {
                    trace!("Keeping malformed element as default: {}", e);
                    T::default()
                })
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Deserialize every element of a JSON array, skipping the ones that don't fit.
/// Anything other than an array yields no records.
pub fn records<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    trace!("Skipping malformed record: {}", e);
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        #[serde(deserialize_with = "lenient_string")]
        label: String,
        #[serde(deserialize_with = "lenient_u64")]
        count: u64,
        #[serde(deserialize_with = "lenient_i64")]
        state: i64,
        #[serde(deserialize_with = "lenient_bool")]
        flag: bool,
    }

    #[test]
    fn test_lenient_scalars() {
        let sample: Sample = serde_json::from_value(json!({
            "label": 13370000,
            "count": "42",
            "state": -1,
            "flag": 1
        }))
        .unwrap();
        assert_eq!(
            sample,
            Sample { label: "13370000".into(), count: 42, state: -1, flag: true }
        );
    }

    #[test]
    fn test_nulls_and_missing_fields() {
        let sample: Sample = serde_json::from_value(json!({ "label": null, "count": null })).unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_records_skips_bad_elements() {
        #[derive(Deserialize)]
        struct Strict {
            url: String,
        }

        let items: Vec<Strict> = records(json!([{ "url": "a" }, 7, { "url": "b" }]));
        assert_eq!(items.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        let none: Vec<Strict> = records(json!({ "url": "a" }));
        assert!(none.is_empty());
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Item {
        #[serde(deserialize_with = "lenient_string")]
        name: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Collections {
        #[serde(deserialize_with = "lenient_vec")]
        names: Vec<String>,
        #[serde(deserialize_with = "lenient_vec_keep")]
        items: Vec<Item>,
        #[serde(deserialize_with = "or_default")]
        item: Item,
        #[serde(deserialize_with = "lenient_opt_string")]
        note: Option<String>,
        #[serde(deserialize_with = "lenient_opt_i64")]
        id: Option<i64>,
    }

    #[test]
    fn test_null_collections_are_empty() {
        let parsed: Collections = serde_json::from_value(json!({
            "names": null,
            "items": "oops",
            "item": null,
            "note": null,
            "id": null
        }))
        .unwrap();
        assert!(parsed.names.is_empty());
        assert!(parsed.items.is_empty());
        assert_eq!(parsed.item, Item::default());
        assert_eq!(parsed.note, None);
        assert_eq!(parsed.id, None);
    }

    #[test]
    fn test_malformed_elements_skipped_or_kept() {
        let parsed: Collections = serde_json::from_value(json!({
            "names": ["a", 7, "b"],
            "items": [{ "name": "x" }, 7, { "name": 3 }],
            "note": 13380000000i64,
            "id": "42"
        }))
        .unwrap();
        assert_eq!(parsed.names, ["a", "b"]);
        assert_eq!(
            parsed.items,
            vec![Item { name: "x".into() }, Item::default(), Item { name: "3".into() }]
        );
        assert_eq!(parsed.note.as_deref(), Some("13380000000"));
        assert_eq!(parsed.id, Some(42));
    }
}
