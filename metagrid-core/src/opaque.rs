//! Client-defined JSON payloads.
//!
//! Carts, saved subscriptions and search filters store structures the server
//! never inspects. The only rule enforced is the outer shape: a list or a map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MetagridError;

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered sequence of opaque records (cart items, saved subscriptions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct JsonList(Vec<Value>);

impl JsonList {
    pub fn new(items: Vec<Value>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl TryFrom<Value> for JsonList {
    type Error = MetagridError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => Ok(Self(items)),
            other => Err(MetagridError::UnexpectedJsonShape {
                expected: "array",
                found: kind(&other),
            }),
        }
    }
}

impl From<JsonList> for Value {
    fn from(list: JsonList) -> Self {
        Value::Array(list.0)
    }
}

/// String-keyed mapping of opaque values (active facets, subscription facets).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct JsonMap(Map<String, Value>);

impl JsonMap {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Value> for JsonMap {
    type Error = MetagridError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MetagridError::UnexpectedJsonShape {
                expected: "object",
                found: kind(&other),
            }),
        }
    }
}

impl From<JsonMap> for Value {
    fn from(map: JsonMap) -> Self {
        Value::Object(map.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_accepts_any_array() {
        let list: JsonList =
            serde_json::from_value(json!([{"id": "dataset-1"}, 42, "free text"])).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.as_slice()[1], json!(42));
    }

    #[test]
    fn test_list_rejects_object() {
        let err = JsonList::try_from(json!({"title": "dataset"})).unwrap_err();
        assert_eq!(
            err,
            MetagridError::UnexpectedJsonShape {
                expected: "array",
                found: "object"
            }
        );
        assert!(serde_json::from_value::<JsonList>(json!("nope")).is_err());
    }

    #[test]
    fn test_map_rejects_array() {
        let err = JsonMap::try_from(json!(["facet"])).unwrap_err();
        assert!(err.to_string().contains("Expected a JSON object, got array"));
    }

    #[test]
    fn test_map_serializes_as_plain_object() {
        let map: JsonMap = serde_json::from_value(json!({"facet": ["option"]})).unwrap();
        assert_eq!(map.get("facet"), Some(&json!(["option"])));
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({"facet": ["option"]}));
    }

    #[test]
    fn test_defaults_are_empty() {
        assert!(JsonList::default().is_empty());
        assert_eq!(Value::from(JsonMap::default()), json!({}));
    }
}
