use crate::types::Dynamic;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list_of(elem: AttributeType) -> Self {
        AttributeType::List(Box::new(elem))
    }

    pub fn set_of(elem: AttributeType) -> Self {
        AttributeType::Set(Box::new(elem))
    }

    pub fn map_of(elem: AttributeType) -> Self {
        AttributeType::Map(Box::new(elem))
    }

    /// The cty type constraint Terraform expects in schema responses
    pub fn to_cty_json(&self) -> Value {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_cty_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_cty_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_cty_json()]),
            AttributeType::Object(attrs) => {
                let fields: serde_json::Map<String, Value> = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_cty_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_cty_json().to_string().into_bytes()
    }

    /// Whether a decoded value conforms to this type. Null and unknown always do.
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            // Terraform converts primitives to strings before sending them
            (Dynamic::Number(_), AttributeType::String) => true,
            (Dynamic::Bool(_), AttributeType::String) => true,
            (Dynamic::List(items), AttributeType::List(elem))
            | (Dynamic::List(items), AttributeType::Set(elem)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Map(elem)) => {
                map.values().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Object(fields)) => fields
                .iter()
                .all(|(name, ty)| map.get(name).map(|v| ty.accepts(v)).unwrap_or(true)),
            _ => false,
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_cty_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types_render_as_cty_strings() {
        assert_eq!(AttributeType::String.to_bytes(), b"\"string\"".to_vec());
        assert_eq!(AttributeType::Number.to_bytes(), b"\"number\"".to_vec());
        assert_eq!(AttributeType::Bool.to_bytes(), b"\"bool\"".to_vec());
    }

    #[test]
    fn collection_types_nest() {
        let ty = AttributeType::list_of(AttributeType::map_of(AttributeType::String));
        assert_eq!(
            String::from_utf8(ty.to_bytes()).unwrap(),
            r#"["list",["map","string"]]"#
        );
        assert_eq!(
            String::from_utf8(AttributeType::set_of(AttributeType::Number).to_bytes()).unwrap(),
            r#"["set","number"]"#
        );
    }

    #[test]
    fn object_type_lists_fields() {
        let mut fields = HashMap::new();
        fields.insert("endpoint".to_string(), AttributeType::String);
        let rendered = AttributeType::Object(fields).to_cty_json();
        assert_eq!(rendered, json!(["object", {"endpoint": "string"}]));
    }

    #[test]
    fn accepts_checks_element_types() {
        let ty = AttributeType::set_of(AttributeType::String);
        assert!(ty.accepts(&Dynamic::string_list(["a", "b"])));
        assert!(ty.accepts(&Dynamic::Unknown));
        assert!(!ty.accepts(&Dynamic::List(vec![Dynamic::List(vec![])])));
        assert!(!AttributeType::Bool.accepts(&Dynamic::string("yes")));
    }
}
