//! Body validation
//!
//! The body schema of an operation is the object schema assembled by the
//! compiler. Structural checks are delegated to `jsonschema`; its errors are
//! then rewritten into the engine's message and `#`-rooted pointer format.

use jsonschema::Validator;
use serde_json::{Map, Value, json};
use std::fmt;

use crate::validator::Violation;

/// Compiled object schema for a request body
pub struct BodySchema {
    schema: Value,
    validator: Validator,
}

impl fmt::Debug for BodySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodySchema")
            .field("schema", &self.schema)
            .finish()
    }
}

impl BodySchema {
    /// Build the object schema and its validator
    pub fn compile(
        properties: &Map<String, Value>,
        required: &[String],
    ) -> Result<Self, String> {
        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }

        // Definitions in these documents are draft-4 schemas
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(&schema)
            .map_err(|e| e.to_string())?;
        Ok(Self { schema, validator })
    }

    /// All violations; missing-property violations come last.
    ///
    /// Missing required properties of the same object are reported as a
    /// single violation naming all of them.
    pub fn validate(&self, body: &Value) -> Vec<Violation> {
        let mut violations: Vec<(bool, Violation)> = Vec::new();
        let mut reported_required: Vec<String> = Vec::new();

        for error in self.validator.iter_errors(body) {
            let instance_path = error.instance_path.to_string();
            let schema_path = error.schema_path.to_string();
            let pointer = format!("#{}", instance_path);

            match keyword(&schema_path) {
                Some(("required", keyword_pointer)) => {
                    if reported_required.contains(&instance_path) {
                        continue;
                    }
                    reported_required.push(instance_path);
                    let missing =
                        missing_properties(&self.schema, &keyword_pointer, &error.instance);
                    violations.push((true, Violation::new(required_message(&missing), pointer)));
                }
                Some(("type", keyword_pointer)) => {
                    let expected = self
                        .schema
                        .pointer(&keyword_pointer)
                        .map(expected_type_name)
                        .unwrap_or_else(|| "Unknown".to_string());
                    let message = type_mismatch_message(&expected, json_kind(&error.instance));
                    violations.push((false, Violation::new(message, pointer)));
                }
                Some(("enum", _)) => {
                    let message = enum_message(&display_value(&error.instance));
                    violations.push((false, Violation::new(message, pointer)));
                }
                _ => violations.push((false, Violation::new(error.to_string(), pointer))),
            }
        }

        // Property-level errors first, missing properties last
        violations.sort_by_key(|(is_required, _)| *is_required);
        violations.into_iter().map(|(_, violation)| violation).collect()
    }
}

/// Keyword that failed and the JSON pointer to it inside the schema
fn keyword(schema_path: &str) -> Option<(&'static str, String)> {
    let segments: Vec<&str> = schema_path.split('/').collect();
    let position = segments.iter().rposition(|segment| {
        segment.parse::<usize>().is_err() && !segment.is_empty()
    })?;
    let name = match segments[position] {
        "required" => "required",
        "type" => "type",
        "enum" => "enum",
        _ => return None,
    };
    Some((name, segments[..=position].join("/")))
}

fn missing_properties(schema: &Value, required_pointer: &str, instance: &Value) -> Vec<String> {
    let declared = schema
        .pointer(required_pointer)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    declared
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| instance.get(*name).is_none())
        .map(str::to_string)
        .collect()
}

fn expected_type_name(type_keyword: &Value) -> String {
    match type_keyword {
        Value::String(name) => capitalize(name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn required_message(missing: &[String]) -> String {
    match missing {
        [single] => format!("Required property {} was not present.", single),
        _ => format!(
            "Required properties {} were not present.",
            missing.join(", ")
        ),
    }
}

pub(crate) fn type_mismatch_message(expected: &str, actual: &str) -> String {
    format!("Type mismatch. Expected {} but got {}.", expected, actual)
}

pub(crate) fn enum_message(value: &str) -> String {
    format!("Value \"{}\" is not allowed in enum.", value)
}

/// Capitalized JSON type name of a value
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Integer",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

/// Strings print bare, everything else as JSON text
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
