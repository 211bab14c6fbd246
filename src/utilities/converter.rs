//! Coercion of raw model output into a declared output schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::utilities::schema::{FieldKind, OutputSchema};

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid fence pattern")
});

/// Raised when a model answer cannot populate the declared schema.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConverterError {
    #[error("no JSON object found in output")]
    NoJson,

    #[error("output for {schema} is not a JSON object")]
    NotAnObject { schema: String },

    #[error("missing required field '{field}' for {schema}")]
    MissingField { schema: String, field: String },

    #[error("field '{field}' of {schema} expected {expected}, got {found}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: FieldKind,
        found: String,
    },

    /// The schema-checked value could not be deserialized into the record type.
    #[error("cannot build {schema}: {message}")]
    Deserialize { schema: String, message: String },
}

/// Capability that turns a raw model answer into a value matching a schema.
///
/// The returned value is a JSON object holding exactly the schema's fields.
pub trait Converter: Send + Sync {
    fn coerce(&self, raw: &str, schema: &OutputSchema) -> Result<Value, ConverterError>;
}

/// Extracts a JSON object from the answer and checks it field by field.
///
/// Primitive coercion is lax in the usual direction: integers accept whole
/// floats and numeric strings, numbers accept numeric strings, booleans
/// accept `"true"` and `"false"`. Strings only accept strings. Fields not in
/// the schema are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl JsonConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for JsonConverter {
    fn coerce(&self, raw: &str, schema: &OutputSchema) -> Result<Value, ConverterError> {
        let parsed = extract_json(raw).ok_or(ConverterError::NoJson)?;
        let object = match parsed {
            Value::Object(map) => map,
            _ => {
                return Err(ConverterError::NotAnObject {
                    schema: schema.name.clone(),
                })
            }
        };
        validate_model(&object, schema)
    }
}

/// Find a JSON value in model output: the whole text, a fenced block, or
/// the span between the first `{` and the last `}`.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(cap) = FENCED_JSON.captures(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&cap[1]) {
            return Some(value);
        }
    }

    handle_partial_json(trimmed)
}

fn handle_partial_json(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end]).ok()
}

/// Check an object against the schema and build the coerced record.
pub fn validate_model(object: &Map<String, Value>, schema: &OutputSchema) -> Result<Value, ConverterError> {
    let mut out = Map::new();
    for field in &schema.fields {
        let value = match object.get(&field.name) {
            Some(Value::Null) | None => {
                return Err(ConverterError::MissingField {
                    schema: schema.name.clone(),
                    field: field.name.clone(),
                })
            }
            Some(v) => v,
        };
        let coerced = coerce_value(value, field.kind).ok_or_else(|| ConverterError::TypeMismatch {
            schema: schema.name.clone(),
            field: field.name.clone(),
            expected: field.kind,
            found: describe(value),
        })?;
        out.insert(field.name.clone(), coerced);
    }
    Ok(Value::Object(out))
}

fn coerce_value(value: &Value, kind: FieldKind) -> Option<Value> {
    match (kind, value) {
        (FieldKind::String, Value::String(_)) => Some(value.clone()),
        (FieldKind::Integer, Value::Number(n)) => integer_from_number(n),
        (FieldKind::Integer, Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .map(Value::from)
                .or_else(|| s.parse::<f64>().ok().and_then(whole_float))
        }
        (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Boolean, Value::String(s)) => match s.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn integer_from_number(n: &Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    if n.is_u64() {
        return None;
    }
    n.as_f64().and_then(whole_float)
}

fn whole_float(f: f64) -> Option<Value> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        None
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
