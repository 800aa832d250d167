//! Core value types for tfplug
//!
//! Terraform values travel as msgpack (or JSON for upgraded state). `Dynamic`
//! is the in-memory form, `Config` and `State` are the top-level objects handed
//! to providers, and `Diagnostics` carries errors and warnings back to Terraform.

use serde::de::{self, IgnoredAny, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

const UNKNOWN_SENTINEL: &str = "__unknown__";
const MSGPACK_EXT_STRUCT: &str = "_ExtStruct";

/// Dynamic represents Terraform values that can be of any type
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Dynamic {
    #[default]
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    /// Lists, sets and tuples
    List(Vec<Dynamic>),
    /// Maps and objects
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn string(value: impl Into<String>) -> Self {
        Dynamic::String(value.into())
    }

    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dynamic::List(values.into_iter().map(|v| Dynamic::String(v.into())).collect())
    }

    pub fn string_map<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Dynamic::Map(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), Dynamic::String(v.into())))
                .collect(),
        )
    }

    /// Wraps a single object the way list blocks with max_items = 1 are stored
    pub fn block(values: HashMap<String, Dynamic>) -> Self {
        Dynamic::List(vec![Dynamic::Map(values)])
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().map(|n| n as i64)
    }

    pub fn as_list(&self) -> Option<&Vec<Dynamic>> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when neither this value nor anything nested in it is unknown
    pub fn is_known(&self) -> bool {
        match self {
            Dynamic::Unknown => false,
            Dynamic::List(items) => items.iter().all(Dynamic::is_known),
            Dynamic::Map(map) => map.values().all(Dynamic::is_known),
            _ => true,
        }
    }

    /// Null, an empty string, or an empty collection
    pub fn is_empty(&self) -> bool {
        match self {
            Dynamic::Null => true,
            Dynamic::String(s) => s.is_empty(),
            Dynamic::List(l) => l.is_empty(),
            Dynamic::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// The first element of a list block, if it is an object
    pub fn first_block(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::List(items) => items.first().and_then(Dynamic::as_map),
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    /// String elements of a list or set, skipping anything else
    pub fn string_values(&self) -> Vec<String> {
        self.as_list()
            .map(|items| items.iter().filter_map(|v| v.as_string().cloned()).collect())
            .unwrap_or_default()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }

    /// Structural equality that ignores list order, used for sets
    pub fn set_equal(&self, other: &Dynamic) -> bool {
        match (self, other) {
            (Dynamic::List(a), Dynamic::List(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.set_equal(y)))
            }
            (Dynamic::Map(a), Dynamic::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.set_equal(w)).unwrap_or(false))
            }
            _ => self == other,
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl From<f64> for Dynamic {
    fn from(value: f64) -> Self {
        Dynamic::Number(value)
    }
}

impl From<i64> for Dynamic {
    fn from(value: i64) -> Self {
        Dynamic::Number(value as f64)
    }
}

impl From<i32> for Dynamic {
    fn from(value: i32) -> Self {
        Dynamic::Number(f64::from(value))
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Dynamic::Null)
    }
}

struct UnknownPayload;

impl Serialize for UnknownPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&[0])
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => {
                if serializer.is_human_readable() {
                    serializer.serialize_str(UNKNOWN_SENTINEL)
                } else {
                    // msgpack extension type 0 is Terraform's unknown value
                    serializer.serialize_newtype_struct(MSGPACK_EXT_STRUCT, &(0i8, UnknownPayload))
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Dynamic, D::Error> {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_bytes<E: de::Error>(self, value: &[u8]) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::String(String::from_utf8_lossy(value).into_owned()))
            }

            // rmp-serde surfaces msgpack extension values as a newtype struct
            fn visit_newtype_struct<D: Deserializer<'de>>(
                self,
                deserializer: D,
            ) -> std::result::Result<Dynamic, D::Error> {
                IgnoredAny::deserialize(deserializer)?;
                Ok(Dynamic::Unknown)
            }

            fn visit_seq<V: de::SeqAccess<'de>>(
                self,
                mut seq: V,
            ) -> std::result::Result<Dynamic, V::Error> {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V: de::MapAccess<'de>>(
                self,
                mut map: V,
            ) -> std::result::Result<Dynamic, V::Error> {
                let mut values = HashMap::new();
                while let Some((key, value)) = map.next_entry::<String, Dynamic>()? {
                    values.insert(key, value);
                }
                Ok(Dynamic::Map(values))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

macro_rules! value_getters {
    ($ty:ident) => {
        impl $ty {
            pub fn new() -> Self {
                Self {
                    values: HashMap::new(),
                }
            }

            pub fn from_values(values: HashMap<String, Dynamic>) -> Self {
                Self { values }
            }

            /// The raw value, with null treated as absent
            pub fn get(&self, key: &str) -> Option<&Dynamic> {
                self.values.get(key).filter(|v| !v.is_null())
            }

            pub fn get_string(&self, key: &str) -> Option<String> {
                self.values.get(key).and_then(|v| v.as_string()).cloned()
            }

            pub fn get_bool(&self, key: &str) -> Option<bool> {
                self.values.get(key).and_then(|v| v.as_bool())
            }

            pub fn get_number(&self, key: &str) -> Option<f64> {
                self.values.get(key).and_then(|v| v.as_number())
            }

            pub fn get_i64(&self, key: &str) -> Option<i64> {
                self.values.get(key).and_then(|v| v.as_i64())
            }

            pub fn get_list(&self, key: &str) -> Option<&Vec<Dynamic>> {
                self.values.get(key).and_then(|v| v.as_list())
            }

            pub fn get_map(&self, key: &str) -> Option<&HashMap<String, Dynamic>> {
                self.values.get(key).and_then(|v| v.as_map())
            }

            /// The first object of a list block
            pub fn get_block(&self, key: &str) -> Option<&HashMap<String, Dynamic>> {
                self.values.get(key).and_then(|v| v.first_block())
            }

            pub fn get_string_map(&self, key: &str) -> HashMap<String, String> {
                self.get_map(key)
                    .map(|m| {
                        m.iter()
                            .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.clone())))
                            .collect()
                    })
                    .unwrap_or_default()
            }

            pub fn require_string(&self, key: &str) -> crate::Result<String> {
                self.get_string(key).ok_or_else(|| {
                    crate::TfplugError::InvalidState(format!("{} is required", key))
                })
            }

            pub fn set(&mut self, key: impl Into<String>, value: impl Into<Dynamic>) {
                self.values.insert(key.into(), value.into());
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Configuration values as written by the user
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub values: HashMap<String, Dynamic>,
}

/// Resource or data source state
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub values: HashMap<String, Dynamic>,
}

value_getters!(Config);
value_getters!(State);

impl From<State> for Config {
    fn from(state: State) -> Self {
        Config {
            values: state.values,
        }
    }
}

impl From<Config> for State {
    fn from(config: Config) -> Self {
        State {
            values: config.values,
        }
    }
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
    /// Top-level attribute the diagnostic points at, if any
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error<S, D>(&mut self, summary: S, detail: Option<D>)
    where
        S: Into<String>,
        D: Into<String>,
    {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_warning<S, D>(&mut self, summary: S, detail: Option<D>)
    where
        S: Into<String>,
        D: Into<String>,
    {
        self.warnings.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
            attribute: None,
        });
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: Some(detail.into()),
            attribute: Some(attribute.into()),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn msgpack_round_trips_nested_values() {
        let mut inner = HashMap::new();
        inner.insert("enabled".to_string(), Dynamic::Bool(true));
        inner.insert("count".to_string(), Dynamic::Number(3.0));

        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::string("search"));
        values.insert("cluster".to_string(), Dynamic::block(inner));
        values.insert("ratio".to_string(), Dynamic::Number(0.5));
        values.insert("missing".to_string(), Dynamic::Null);

        let bytes = rmp_serde::to_vec_named(&values).unwrap();
        let decoded: HashMap<String, Dynamic> = rmp_serde::from_slice(&bytes).unwrap();

        assert_eq!(decoded, values);
    }

    #[test]
    fn unknown_encodes_as_msgpack_extension() {
        let bytes = rmp_serde::to_vec(&Dynamic::Unknown).unwrap();
        assert_eq!(bytes, vec![0xd4, 0x00, 0x00]);

        let decoded: Dynamic = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, Dynamic::Unknown);
    }

    #[test]
    fn unknown_encodes_as_json_sentinel() {
        let json = serde_json::to_string(&Dynamic::Unknown).unwrap();
        assert_eq!(json, "\"__unknown__\"");

        let decoded: Dynamic = serde_json::from_str(&json).unwrap();
        assert!(decoded.is_unknown());
    }

    #[test]
    fn state_getters_treat_null_as_absent() {
        let mut state = State::new();
        state.set("name", "idx");
        state.set("description", Dynamic::Null);

        assert_eq!(state.get_string("name"), Some("idx".to_string()));
        assert!(state.get("description").is_none());
        assert!(state.require_string("description").is_err());
    }

    #[test]
    fn set_equal_ignores_order() {
        let a = Dynamic::string_list(["a", "b"]);
        let b = Dynamic::string_list(["b", "a"]);
        assert!(a.set_equal(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn diagnostics_extend_merges_both_kinds() {
        let mut diags = Diagnostics::new();
        diags.add_error("first", None::<String>);

        let mut other = Diagnostics::new();
        other.add_warning("careful", Some("detail"));
        other.add_attribute_error("name", "bad name", "too long");

        diags.extend(other);
        assert_eq!(diags.errors.len(), 2);
        assert_eq!(diags.warnings.len(), 1);
        assert_eq!(diags.errors[1].attribute.as_deref(), Some("name"));
    }
}
