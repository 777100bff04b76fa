//! Conversions between plain data and observable values.

use crate::{object::Object, value::Value};

/// Wraps plain data into observable values, recursively.
///
/// JSON objects become [`Object`]s whose fields are tracked; arrays become lists of
/// converted items.
pub fn observable(data: serde_json::Value) -> Value {
    match data {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.into()),
        serde_json::Value::Array(items) => {
            Value::List(items.into_iter().map(observable).collect())
        }
        serde_json::Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .fold(Object::new(), |object, (key, value)| {
                    object.with(key, observable(value))
                }),
        ),
    }
}

impl Value {
    /// An untracked plain-data copy. Functions and `Undefined` fields are left out,
    /// computed fields are evaluated.
    pub fn snapshot(&self) -> serde_json::Value {
        ferry_reactive::untrack(|| to_json(self)).unwrap_or(serde_json::Value::Null)
    }
}

fn to_json(value: &Value) -> Option<serde_json::Value> {
    Some(match value {
        Value::Undefined | Value::Function(_) => return None,
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::List(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| to_json(item).unwrap_or(serde_json::Value::Null))
                .collect(),
        ),
        Value::Object(object) => serde_json::Value::Object(
            object
                .keys()
                .into_iter()
                .filter_map(|key| {
                    let value = to_json(&object.get(&key))?;
                    Some((key, value))
                })
                .collect(),
        ),
    })
}
