//! Callback recipes
//!
//! Field callbacks (`compute`, `isDisabled`, `click`, ...) cannot travel into
//! the page as code. Instead a schema names one of a closed set of recipes and
//! the renderer interprets it against the current form state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments a recipe is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// The field's own value, when the callback receives one
    pub value: Option<&'a Value>,
    pub data: &'a Map<String, Value>,
    pub payload: &'a Map<String, Value>,
}

impl<'a> Scope<'a> {
    pub fn new(data: &'a Map<String, Value>, payload: &'a Map<String, Value>) -> Self {
        Self {
            value: None,
            data,
            payload,
        }
    }

    pub fn with_value(mut self, value: &'a Value) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// Returns the value the callback was called with (`null` if none)
    Echo,
    /// Returns a fixed value (`() => true`, `() => "Invalid"`)
    Const { value: Value },
    /// Returns `data[name]`
    Field { name: String },
    /// `!!data[name]`
    FieldTruthy { name: String },
    /// `data[name] === value`
    FieldEquals { name: String, value: Value },
    Not { recipe: Box<Recipe> },
    /// Joins the present values of `fields`. A `true` flag contributes the
    /// field name itself; falsy values are skipped. An empty result yields
    /// `fallback` (or an empty string).
    Join {
        fields: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    /// Replaces the form data (`onChange({...})` from a click handler)
    EmitChange { data: Map<String, Value> },
}

fn default_separator() -> String {
    ", ".to_string()
}

impl Recipe {
    pub fn evaluate(&self, scope: &Scope<'_>) -> Value {
        match self {
            Recipe::Echo => scope.value.cloned().unwrap_or(Value::Null),
            Recipe::Const { value } => value.clone(),
            Recipe::Field { name } => scope.data.get(name).cloned().unwrap_or(Value::Null),
            Recipe::FieldTruthy { name } => {
                Value::Bool(scope.data.get(name).is_some_and(is_truthy))
            }
            Recipe::FieldEquals { name, value } => {
                Value::Bool(scope.data.get(name).unwrap_or(&Value::Null) == value)
            }
            Recipe::Not { recipe } => Value::Bool(!is_truthy(&recipe.evaluate(scope))),
            Recipe::Join {
                fields,
                separator,
                fallback,
            } => {
                let parts: Vec<String> = fields
                    .iter()
                    .filter_map(|name| match scope.data.get(name) {
                        Some(Value::Bool(true)) => Some(name.clone()),
                        Some(v) if is_truthy(v) => Some(display_value(v)),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    Value::String(fallback.clone().unwrap_or_default())
                } else {
                    Value::String(parts.join(separator))
                }
            }
            Recipe::EmitChange { data } => Value::Object(data.clone()),
        }
    }

    /// Evaluate and coerce to a boolean.
    pub fn test(&self, scope: &Scope<'_>) -> bool {
        is_truthy(&self.evaluate(scope))
    }
}

/// Dynamic truthiness: `null`, `false`, `0` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a value as an input would display it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
