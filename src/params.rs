//! Path and query parameter validation
//!
//! Parameters are checked one at a time in declaration order and the first
//! failure is returned. [`validate_params`] treats values as raw request text
//! and coerces them to the declared type; [`validate_typed_params`] expects a
//! map that already carries JSON numbers, booleans and lists.

use serde_json::{Map, Value};

use crate::body::{display_value, enum_message, json_kind, required_message, type_mismatch_message};
use crate::compiler::ResolvedOperation;
use crate::document::{CollectionFormat, Items, ParamType, Parameter};
use crate::request::key_path;
use crate::validator::{ValidationOutcome, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Values are request text; parse them as the declared type
    Coerce,
    /// Values must already have the declared JSON type
    Strict,
}

/// Validate raw request parameters against the operation's path and query
/// parameters
pub fn validate_params(operation: &ResolvedOperation, params: &Map<String, Value>) -> ValidationOutcome {
    check_all(operation, params, Mode::Coerce)
}

/// Validate an already-typed parameter map; no string coercion happens
pub fn validate_typed_params(
    operation: &ResolvedOperation,
    params: &Map<String, Value>,
) -> ValidationOutcome {
    check_all(operation, params, Mode::Strict)
}

fn check_all(operation: &ResolvedOperation, params: &Map<String, Value>, mode: Mode) -> ValidationOutcome {
    operation
        .request_parameters()
        .find_map(|parameter| check_parameter(parameter, params, mode).err())
        .map(ValidationOutcome::Invalid)
        .unwrap_or(ValidationOutcome::Ok)
}

/// Look up a possibly bracketed name (`filter[route]`) in the nested map
pub fn lookup<'a>(params: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let keys = key_path(name);
    let mut keys = keys.into_iter().filter(|key| !key.is_empty());

    let mut current = params.get(keys.next()?)?;
    for key in keys {
        current = current.as_object()?.get(key)?;
    }

    if current.is_null() { None } else { Some(current) }
}

fn check_parameter(parameter: &Parameter, params: &Map<String, Value>, mode: Mode) -> Result<(), Violation> {
    let Some(value) = lookup(params, &parameter.name) else {
        if parameter.required {
            return Err(Violation::new(
                required_message(std::slice::from_ref(&parameter.name)),
                "#",
            ));
        }
        return Ok(());
    };
    let value = last_repeated(parameter, value, mode);

    let pointer = format!("#/{}", parameter.name);

    if let Some(allowed) = &parameter.enum_values
        && parameter.param_type != Some(ParamType::Array)
        && !enum_allows(allowed, value)
    {
        return Err(Violation::new(enum_message(&display_value(value)), pointer));
    }

    let Some(param_type) = parameter.param_type else {
        return Ok(());
    };

    let items = parameter.items.as_ref();
    let format = parameter.collection_format.unwrap_or_default();
    check_value(param_type, items, format, value, mode, &pointer)
}

fn check_value(
    param_type: ParamType,
    items: Option<&Items>,
    format: CollectionFormat,
    value: &Value,
    mode: Mode,
    pointer: &str,
) -> Result<(), Violation> {
    let mismatch = || {
        Violation::new(
            type_mismatch_message(param_type.display_name(), json_kind(value)),
            pointer,
        )
    };

    let accepted = match (param_type, mode) {
        (ParamType::File, _) => true,
        (ParamType::Array, _) => {
            let elements = array_elements(value, format, mode).ok_or_else(mismatch)?;
            if let Some(items) = items {
                for element in &elements {
                    check_item(items, element, mode, pointer)?;
                }
            }
            true
        }
        (ParamType::Object, _) => value.is_object(),
        (ParamType::String, Mode::Strict) => value.is_string(),
        (ParamType::String, Mode::Coerce) => !value.is_object() && !value.is_array(),
        (ParamType::Integer, Mode::Strict) => value.is_i64() || value.is_u64(),
        (ParamType::Number, Mode::Strict) => value.is_number(),
        (ParamType::Boolean, Mode::Strict) => value.is_boolean(),
        (scalar, Mode::Coerce) => match as_text(value) {
            Some(text) => coerces(scalar, &text),
            None => false,
        },
    };

    if accepted { Ok(()) } else { Err(mismatch()) }
}

fn check_item(items: &Items, element: &Value, mode: Mode, pointer: &str) -> Result<(), Violation> {
    if let Some(allowed) = &items.enum_values
        && items.item_type != ParamType::Array
        && !enum_allows(allowed, element)
    {
        return Err(Violation::new(enum_message(&display_value(element)), pointer));
    }

    check_value(
        items.item_type,
        items.items.as_deref(),
        items.collection_format.unwrap_or_default(),
        element,
        mode,
        pointer,
    )
}

/// Repeated query keys arrive as a list; a scalar parameter takes the last one
fn last_repeated<'a>(parameter: &Parameter, value: &'a Value, mode: Mode) -> &'a Value {
    match (mode, value) {
        (Mode::Coerce, Value::Array(values))
            if !matches!(
                parameter.param_type,
                Some(ParamType::Array | ParamType::Object)
            ) =>
        {
            values.last().unwrap_or(value)
        }
        _ => value,
    }
}

/// Elements of an array parameter, or `None` if the value is not a list
fn array_elements(value: &Value, format: CollectionFormat, mode: Mode) -> Option<Vec<Value>> {
    match (value, mode) {
        (Value::Array(elements), _) => Some(elements.clone()),
        (Value::String(text), Mode::Coerce) => {
            if text.is_empty() {
                return Some(Vec::new());
            }
            let elements = match format.separator() {
                Some(separator) => text
                    .split(separator)
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
                None => vec![value.clone()],
            };
            Some(elements)
        }
        _ => None,
    }
}

/// Scalar request value as text; lists and objects have none
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerces(param_type: ParamType, text: &str) -> bool {
    match param_type {
        ParamType::Integer => text.parse::<i64>().is_ok(),
        ParamType::Number => text.parse::<f64>().is_ok_and(f64::is_finite),
        ParamType::Boolean => matches!(text, "true" | "false"),
        ParamType::String | ParamType::File => true,
        ParamType::Array | ParamType::Object => false,
    }
}

/// Enum members compare by their text form, so `10` and `"10"` are the same
fn enum_allows(allowed: &[Value], value: &Value) -> bool {
    let text = display_value(value);
    allowed.iter().any(|member| member == value || display_value(member) == text)
}
