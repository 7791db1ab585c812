//! Tool calling and function definition types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LlmError;

/// Schema keys whose values are numeric bounds.
const NUMERIC_BOUND_KEYS: [&str; 6] = [
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
];

/// JSON-schema-like description of a function's parameters.
///
/// Unknown schema keys (`additionalProperties`, `$defs`, vendor extensions)
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameters {
    /// Schema type, normally `"object"`
    #[serde(rename = "type", default = "default_schema_type")]
    pub r#type: String,
    /// Property schemas keyed by name
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Names of properties that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Every other schema key
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_schema_type() -> String {
    "object".to_string()
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            r#type: default_schema_type(),
            properties: Map::new(),
            required: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Parameters {
    /// Empty object schema
    pub fn object() -> Self {
        Self::default()
    }

    /// Build parameters from an arbitrary JSON schema value.
    ///
    /// Numeric bounds are accepted as integers or floats. Decoders commonly
    /// hand back `2.0` for `2`; integral floats are normalized to integers so
    /// the schema re-serializes the way it was written.
    pub fn from_value(schema: Value) -> Result<Self, LlmError> {
        let Value::Object(mut map) = schema else {
            return Err(LlmError::InvalidParameter(
                "tool parameters must be a JSON object".to_string(),
            ));
        };
        normalize_bounds(&mut map)?;
        if let Some(Value::Object(props)) = map.get_mut("properties") {
            for (name, prop) in props.iter_mut() {
                if let Value::Object(prop) = prop {
                    normalize_bounds(prop).map_err(|e| {
                        LlmError::InvalidParameter(format!("property `{name}`: {e}"))
                    })?;
                }
            }
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Add a property and mark it required
    pub fn with_required_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Convert back to a plain JSON schema value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

fn normalize_bounds(map: &mut Map<String, Value>) -> Result<(), LlmError> {
    for key in NUMERIC_BOUND_KEYS {
        let Some(value) = map.get_mut(key) else {
            continue;
        };
        let Some(number) = value.as_f64() else {
            return Err(LlmError::InvalidParameter(format!(
                "schema bound `{key}` must be a number, got {value}"
            )));
        };
        if value.is_f64() && number.fract() == 0.0 && number.abs() < 9.0e15 {
            *value = Value::from(number as i64);
        }
    }
    Ok(())
}

/// Function definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Parameter schema
    #[serde(default)]
    pub parameters: Parameters,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Tool type, always `"function"`
    #[serde(rename = "type")]
    pub r#type: String,
    /// Function definition
    pub function: FunctionDefinition,
}

impl Tool {
    /// Create a new function tool
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Parameters,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Function name shortcut
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Required property names
    pub fn required(&self) -> &[String] {
        &self.function.parameters.required
    }
}

/// Provider-agnostic tool choice strategy
///
/// Provider mapping is the adapter's job:
///
/// - **OpenAI**: `"auto"`, `"required"`, `"none"`, or `{"type": "function", "function": {"name": "..."}}`
/// - **Anthropic**: `{"type": "auto"}`, `{"type": "any"}`, tools removed for "none", or `{"type": "tool", "name": "..."}`
/// - **Gemini**: `"AUTO"`, `"ANY"`, `"NONE"`, or allowed function names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide (default)
    #[default]
    Auto,
    /// Prevent tool calls
    None,
    /// Require at least one tool call
    Required,
    /// Force a specific function
    Function {
        /// Name of the function to call
        name: String,
    },
}

impl ToolChoice {
    /// Force a specific function
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }

    /// Function name of a `Function` choice
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Function { name } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn float_and_integer_bounds_are_both_accepted() {
        let params = Parameters::from_value(json!({
            "type": "object",
            "properties": {
                "count": {"type": "integer", "minimum": 1.0, "maximum": 10},
                "ratio": {"type": "number", "maximum": 0.5}
            },
            "required": ["count"]
        }))
        .unwrap();
        assert_eq!(params.properties["count"]["minimum"], json!(1));
        assert_eq!(params.properties["count"]["maximum"], json!(10));
        assert_eq!(params.properties["ratio"]["maximum"], json!(0.5));
        assert_eq!(params.required, vec!["count".to_string()]);
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let schema = json!({
            "type": "object",
            "properties": {"path": {"type": "string"}},
            "required": ["path"],
            "additionalProperties": false,
            "x-vendor-hint": {"cache": true}
        });
        let params = Parameters::from_value(schema.clone()).unwrap();
        assert_eq!(params.extra["additionalProperties"], json!(false));
        assert_eq!(params.extra["x-vendor-hint"], json!({"cache": true}));
        assert_eq!(params.to_value(), schema);
    }

    #[test]
    fn non_numeric_bound_is_rejected() {
        let err = Parameters::from_value(json!({"type": "object", "minimum": "one"})).unwrap_err();
        assert!(matches!(err, LlmError::InvalidParameter(_)));
        let err = Parameters::from_value(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, LlmError::InvalidParameter(_)));
    }

    #[test]
    fn tool_choice_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ToolChoice::Required).unwrap(), json!("required"));
        assert_eq!(
            serde_json::to_value(ToolChoice::function("read_file")).unwrap(),
            json!({"function": {"name": "read_file"}})
        );
    }
}
