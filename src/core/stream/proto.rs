//! Deep conversion of protobuf JSON wrappers into plain JSON.
//!
//! The service SDK hands nested data back as `Struct` / `Value` / `ListValue`
//! messages. In JSON form those show up as `{"fields": {...}}`, `{"stringValue": ...}`,
//! `{"listValue": {"values": [...]}}` and so on. Everything below the first level has
//! to be unwrapped before any field is inspected, so the conversion is recursive and
//! eager.

use serde_json::{Map, Value};

/// One protobuf wrapper shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Null,
    Scalar,
    Integer,
    Struct,
    Fields,
    List,
}

impl Wrapper {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "nullValue" | "null_value" => Some(Self::Null),
            "stringValue" | "string_value" | "numberValue" | "number_value" | "boolValue"
            | "bool_value" => Some(Self::Scalar),
            "integerValue" | "integer_value" => Some(Self::Integer),
            "structValue" | "struct_value" => Some(Self::Struct),
            "listValue" | "list_value" => Some(Self::List),
            _ => None,
        }
    }

    /// Detect a single-key object as a wrapper. A bare `fields` key only counts when
    /// every field is itself a wrapped value, so ordinary objects are never unwrapped.
    fn detect(key: &str, inner: &Value) -> Option<Self> {
        if key == "fields" {
            return inner
                .as_object()
                .is_some_and(|fields| fields.values().all(is_wrapped_value))
                .then_some(Self::Fields);
        }
        Self::from_key(key)
    }

    fn unwrap_inner(self, inner: Value) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Scalar => inner,
            Self::Integer => match inner {
                Value::String(s) => match s.parse::<i64>() {
                    Ok(n) => Value::from(n),
                    Err(_) => Value::String(s),
                },
                other => other,
            },
            Self::Fields => match inner {
                Value::Object(fields) => plain_object(fields),
                other => to_plain(other),
            },
            Self::Struct => match inner {
                Value::Object(mut m) if m.len() == 1 && m.contains_key("fields") => {
                    match m.remove("fields") {
                        Some(Value::Object(fields)) => plain_object(fields),
                        Some(other) => to_plain(other),
                        None => Value::Object(Map::new()),
                    }
                }
                other => to_plain(other),
            },
            Self::List => match inner {
                Value::Object(mut m) => match m.remove("values") {
                    Some(values) => to_plain(values),
                    None => Value::Array(Vec::new()),
                },
                other => to_plain(other),
            },
        }
    }
}

fn is_wrapped_value(v: &Value) -> bool {
    v.as_object().is_some_and(|m| {
        m.len() == 1 && m.keys().next().and_then(|k| Wrapper::from_key(k)).is_some()
    })
}

fn plain_object(map: Map<String, Value>) -> Value {
    Value::Object(map.into_iter().map(|(k, v)| (k, to_plain(v))).collect())
}

/// Recursively replace protobuf wrappers with the plain values they carry.
pub fn to_plain(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(to_plain).collect()),
        Value::Object(map) => {
            let wrapper = match map.iter().next() {
                Some((key, inner)) if map.len() == 1 => Wrapper::detect(key, inner),
                _ => None,
            };
            match wrapper {
                Some(wrapper) => map
                    .into_iter()
                    .next()
                    .map(|(_, inner)| wrapper.unwrap_inner(inner))
                    .unwrap_or(Value::Null),
                None => plain_object(map),
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_struct_row() {
        let row = json!({"fields": {
            "name": {"stringValue": "Jeans"},
            "total": {"numberValue": 42.5},
            "active": {"boolValue": true},
            "note": {"nullValue": "NULL_VALUE"}
        }});
        assert_eq!(
            to_plain(row),
            json!({"name": "Jeans", "total": 42.5, "active": true, "note": null})
        );
    }

    #[test]
    fn unwraps_nested_struct_and_list_values() {
        let v = json!({
            "vegaConfig": {"structValue": {"fields": {
                "mark": {"stringValue": "bar"},
                "data": {"structValue": {"fields": {
                    "values": {"listValue": {"values": [
                        {"structValue": {"fields": {"a": {"numberValue": 1}}}},
                        {"structValue": {"fields": {"a": {"numberValue": 2}}}}
                    ]}}
                }}}
            }}}
        });
        assert_eq!(
            to_plain(v),
            json!({"vegaConfig": {"mark": "bar", "data": {"values": [{"a": 1}, {"a": 2}]}}})
        );
    }

    #[test]
    fn integer_strings_become_numbers() {
        assert_eq!(to_plain(json!({"integerValue": "1561939200"})), json!(1561939200));
        assert_eq!(to_plain(json!({"integerValue": "n/a"})), json!("n/a"));
    }

    #[test]
    fn plain_specs_are_left_alone() {
        let spec = json!({
            "mark": "bar",
            "data": {"values": [{"a": 1}]},
            "encoding": {"x": {"field": "a", "type": "nominal"}},
            "fields": ["a", "b"]
        });
        assert_eq!(to_plain(spec.clone()), spec);
    }

    #[test]
    fn fields_object_without_wrappers_is_not_a_struct() {
        let v = json!({"fields": {"a": 1}});
        assert_eq!(to_plain(v.clone()), v);
    }

    #[test]
    fn arrays_are_converted_elementwise() {
        let v = json!([{"stringValue": "x"}, [{"numberValue": 1}], 3]);
        assert_eq!(to_plain(v), json!(["x", [1], 3]));
    }
}
