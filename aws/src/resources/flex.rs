//! Helpers for moving values between Terraform objects and API structs

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;
use std::collections::HashMap;
use tfplug::Dynamic;

/// Attribute values of a resource or of one nested block item
pub type Object = HashMap<String, Dynamic>;

/// Typed reads over an [`Object`]. Empty strings read as absent, matching how
/// Terraform reports unset optional strings.
pub trait ObjectExt {
    fn string(&self, key: &str) -> Option<String>;
    fn bool(&self, key: &str) -> Option<bool>;
    fn int(&self, key: &str) -> Option<i64>;
    /// First item of a list block
    fn block(&self, key: &str) -> Option<&Object>;
    /// All items of a list or set block
    fn blocks(&self, key: &str) -> Vec<&Object>;
    fn strings(&self, key: &str) -> Vec<String>;
    fn string_map(&self, key: &str) -> HashMap<String, String>;
}

impl ObjectExt for Object {
    fn string(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Dynamic::as_string)
            .filter(|s| !s.is_empty())
            .cloned()
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Dynamic::as_bool)
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Dynamic::as_i64)
    }

    fn block(&self, key: &str) -> Option<&Object> {
        match self.get(key) {
            Some(Dynamic::List(items)) => items.first().and_then(Dynamic::as_map),
            Some(Dynamic::Map(map)) => Some(map),
            _ => None,
        }
    }

    fn blocks(&self, key: &str) -> Vec<&Object> {
        match self.get(key) {
            Some(Dynamic::List(items)) => items.iter().filter_map(Dynamic::as_map).collect(),
            Some(Dynamic::Map(map)) => vec![map],
            _ => Vec::new(),
        }
    }

    fn strings(&self, key: &str) -> Vec<String> {
        self.get(key).map(Dynamic::string_values).unwrap_or_default()
    }

    fn string_map(&self, key: &str) -> HashMap<String, String> {
        match self.get(key) {
            Some(Dynamic::Map(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.clone())))
                .collect(),
            _ => HashMap::new(),
        }
    }
}

/// Builds an object from `(attribute, value)` pairs
pub fn object<const N: usize>(fields: [(&str, Dynamic); N]) -> Object {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// A one-item list block, or an empty block when there is nothing to show
pub fn block(value: Option<Object>) -> Dynamic {
    match value {
        Some(object) => Dynamic::block(object),
        None => Dynamic::List(vec![]),
    }
}

pub fn blocks(values: Vec<Object>) -> Dynamic {
    Dynamic::List(values.into_iter().map(Dynamic::Map).collect())
}

/// Set of strings, sorted so repeated reads produce identical state
pub fn string_set(values: &[String]) -> Dynamic {
    let mut sorted = values.to_vec();
    sorted.sort();
    sorted.dedup();
    Dynamic::string_list(sorted)
}

pub fn string_map(values: &HashMap<String, String>) -> Dynamic {
    Dynamic::string_map(values.iter().map(|(k, v)| (k.clone(), v.clone())))
}

/// Non-empty list of strings, or `None`
pub fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Epoch seconds as an RFC 3339 timestamp
pub fn timestamp(epoch_seconds: Option<f64>) -> Dynamic {
    epoch_seconds
        .and_then(|secs| {
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            DateTime::from_timestamp(whole, nanos.min(999_999_999))
        })
        .map(|dt| Dynamic::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or_default()
}

/// RFC 3339 timestamp as epoch seconds
pub fn epoch_seconds(timestamp: &str) -> Option<f64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp() as f64)
}

/// Whether `key` differs between two objects. Null and empty values are the
/// same and list order is ignored.
pub fn has_change(prior: &Object, planned: &Object, key: &str) -> bool {
    let value = |object: &Object| {
        object
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_default()
    };
    !value(prior).set_equal(&value(planned))
}

/// Nulls the `false`, `0`, `""` and empty collections the API reports for
/// attributes that are null in `prior`, pairing nested block items by index.
/// Keys missing from `prior` keep what the API reported.
pub fn settle_zero_values(prior: &Object, values: &mut Object) {
    for (key, value) in values.iter_mut() {
        let Some(before) = prior.get(key) else {
            continue;
        };
        match (before, value) {
            (Dynamic::Null, value) => {
                if is_zero(value) {
                    *value = Dynamic::Null;
                }
            }
            (Dynamic::List(before), Dynamic::List(items)) => {
                for (before, item) in before.iter().zip(items.iter_mut()) {
                    if let (Dynamic::Map(before), Dynamic::Map(item)) = (before, item) {
                        settle_zero_values(before, item);
                    }
                }
            }
            (Dynamic::Map(before), Dynamic::Map(item)) => settle_zero_values(before, item),
            _ => {}
        }
    }
}

fn is_zero(value: &Dynamic) -> bool {
    match value {
        Dynamic::Bool(b) => !b,
        Dynamic::Number(n) => *n == 0.0,
        Dynamic::String(s) => s.is_empty(),
        Dynamic::List(items) => items.is_empty(),
        Dynamic::Map(map) => map.is_empty(),
        Dynamic::Null | Dynamic::Unknown => false,
    }
}

/// Replaces values still unknown after apply with null
pub fn resolve_unknowns(values: &mut Object) {
    for value in values.values_mut() {
        resolve_unknown(value);
    }
}

fn resolve_unknown(value: &mut Dynamic) {
    match value {
        Dynamic::Unknown => *value = Dynamic::Null,
        Dynamic::List(items) => items.iter_mut().for_each(resolve_unknown),
        Dynamic::Map(map) => map.values_mut().for_each(resolve_unknown),
        _ => {}
    }
}

/// Re-serializes a JSON document without insignificant whitespace
pub fn normalize_json(document: &str) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_str(document)?;
    serde_json::to_string(&value)
}

/// Whether two IAM policy documents grant the same thing. Key order, the
/// order of list entries and single values written as one-element lists do
/// not matter.
pub fn policies_equivalent(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(a), Ok(b)) => canonical_policy(a) == canonical_policy(b),
        _ => false,
    }
}

fn canonical_policy(value: Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items: Vec<Value> = items.into_iter().map(canonical_policy).collect();
            if items.len() == 1 {
                return items.remove(0);
            }
            items.sort_by_key(|item| item.to_string());
            Value::Array(items)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonical_policy(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Dynamic-level form of [`policies_equivalent`] for plan modifiers
pub fn equivalent_policy_values(old: &Dynamic, new: &Dynamic) -> bool {
    match (old.as_string(), new.as_string()) {
        (Some(old), Some(new)) => policies_equivalent(old, new),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn object_reads_nested_blocks() {
        let inner = object([("enabled", Dynamic::Bool(true)), ("kms_key_id", Dynamic::string(""))]);
        let outer = object([
            ("encrypt_at_rest", Dynamic::block(inner)),
            ("subnet_ids", Dynamic::string_list(["b", "a"])),
            ("instance_count", Dynamic::Number(3.0)),
        ]);

        let encrypt = outer.block("encrypt_at_rest").unwrap();
        assert_eq!(encrypt.bool("enabled"), Some(true));
        assert_eq!(encrypt.string("kms_key_id"), None);
        assert_eq!(outer.strings("subnet_ids"), vec!["b", "a"]);
        assert_eq!(outer.int("instance_count"), Some(3));
        assert!(outer.block("missing").is_none());
        assert!(outer.blocks("missing").is_empty());
    }

    #[test]
    fn string_sets_are_sorted() {
        let set = string_set(&["sg-2".to_string(), "sg-1".to_string(), "sg-2".to_string()]);
        assert_eq!(set, Dynamic::string_list(["sg-1", "sg-2"]));
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(
            timestamp(Some(1_609_459_200.0)),
            Dynamic::string("2021-01-01T00:00:00Z")
        );
        assert_eq!(timestamp(None), Dynamic::Null);
        assert_eq!(epoch_seconds("2021-01-01T00:00:00Z"), Some(1_609_459_200.0));
    }

    #[test]
    fn policies_compare_semantically() {
        let a = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["es:*"],"Principal":"*"}]}"#;
        let b = r#"{
            "Statement": {"Principal": "*", "Action": "es:*", "Effect": "Allow"},
            "Version": "2012-10-17"
        }"#;
        assert!(policies_equivalent(a, b));
        assert!(!policies_equivalent(a, r#"{"Version":"2012-10-17","Statement":[]}"#));
        assert!(!policies_equivalent(a, "not json"));
    }

    #[test]
    fn changes_ignore_emptiness_and_order() {
        let prior = object([
            ("description", Dynamic::Null),
            ("subnet_ids", Dynamic::string_list(["a", "b"])),
            ("ebs_options", Dynamic::List(vec![])),
        ]);
        let planned = object([
            ("description", Dynamic::string("")),
            ("subnet_ids", Dynamic::string_list(["b", "a"])),
            ("ebs_options", Dynamic::block(object([("ebs_enabled", Dynamic::Bool(true))]))),
        ]);

        assert!(!has_change(&prior, &planned, "description"));
        assert!(!has_change(&prior, &planned, "subnet_ids"));
        assert!(!has_change(&prior, &planned, "missing"));
        assert!(has_change(&prior, &planned, "ebs_options"));
    }

    #[test]
    fn zero_values_settle_to_null() {
        let prior = object([
            ("warm_type", Dynamic::Null),
            ("instance_count", Dynamic::Number(1.0)),
            (
                "cluster_config",
                Dynamic::block(object([
                    ("zone_awareness_enabled", Dynamic::Null),
                    ("dedicated_master_enabled", Dynamic::Bool(false)),
                ])),
            ),
        ]);
        let mut values = object([
            ("warm_type", Dynamic::string("")),
            ("instance_count", Dynamic::Number(0.0)),
            ("imported", Dynamic::Bool(false)),
            (
                "cluster_config",
                Dynamic::block(object([
                    ("zone_awareness_enabled", Dynamic::Bool(false)),
                    ("dedicated_master_enabled", Dynamic::Bool(false)),
                ])),
            ),
        ]);

        settle_zero_values(&prior, &mut values);

        assert_eq!(values["warm_type"], Dynamic::Null);
        assert_eq!(values["instance_count"], Dynamic::Number(0.0));
        assert_eq!(values["imported"], Dynamic::Bool(false));
        let cluster = values.block("cluster_config").unwrap();
        assert_eq!(cluster["zone_awareness_enabled"], Dynamic::Null);
        assert_eq!(cluster["dedicated_master_enabled"], Dynamic::Bool(false));
    }

    #[test]
    fn unknowns_resolve_to_null() {
        let mut values = object([
            ("arn", Dynamic::Unknown),
            ("vpc_options", Dynamic::block(object([("vpc_id", Dynamic::Unknown)]))),
        ]);
        resolve_unknowns(&mut values);
        assert_eq!(values["arn"], Dynamic::Null);
        assert_eq!(values.block("vpc_options").unwrap()["vpc_id"], Dynamic::Null);
    }

    #[test]
    fn json_is_normalized() {
        assert_eq!(normalize_json("{ \"a\" : [1, 2] }").unwrap(), r#"{"a":[1,2]}"#);
        assert!(normalize_json("{").is_err());
    }
}
