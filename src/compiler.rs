//! Schema compiler
//!
//! Merges description documents and turns every declared operation into a
//! [`ResolvedOperation`]: `$ref`s resolved against the merged `definitions`,
//! body parameters folded into a single object schema, path and query
//! parameters kept verbatim for the parameter validator.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::body::BodySchema;
use crate::document::{Document, DocumentLoader, HttpMethod, Parameter, PathItem};
use crate::error::{CompileError, Result};
use crate::registry::{OperationKey, Registry, RegistryEntry};

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Compiled, validation-ready form of one (method, path template) pair
#[derive(Debug)]
pub struct ResolvedOperation {
    pub key: OperationKey,
    pub method: HttpMethod,
    pub template: String,
    pub base_path: String,
    pub operation_id: Option<String>,
    /// Body properties with every `$ref` inlined
    pub properties: Map<String, Value>,
    /// Required body property names, first-declared order
    pub required: Vec<String>,
    /// Declared parameters of every location, in declaration order
    pub parameters: Vec<Parameter>,
    /// `None` when the operation declares no body parameter
    pub body: Option<BodySchema>,
}

impl ResolvedOperation {
    /// Path and query parameters in declaration order
    pub fn request_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_path_or_query())
    }
}

/// `paths` and `definitions` of several documents merged key-wise
#[derive(Debug, Default)]
pub struct MergedDocument {
    /// Path template -> (base path of the contributing document, path item)
    pub paths: BTreeMap<String, (String, PathItem)>,
    pub definitions: Map<String, Value>,
}

/// Merge documents in order; later documents win on key collision
pub fn merge_documents(documents: &[Document]) -> MergedDocument {
    let mut merged = MergedDocument::default();

    for document in documents {
        let base_path = document.base_path.clone().unwrap_or_default();
        for (template, item) in &document.paths {
            merged
                .paths
                .insert(template.clone(), (base_path.clone(), item.clone()));
        }
        for (name, schema) in &document.definitions {
            merged.definitions.insert(name.clone(), schema.clone());
        }
    }

    merged
}

/// Compile documents into a registry.
///
/// Fails on the first unresolvable or cyclic `$ref`, or on a body schema
/// that cannot be turned into a validator.
pub fn compile(documents: &[Document]) -> Result<Registry> {
    let merged = merge_documents(documents);
    let mut entries = Vec::new();

    for (template, (base_path, item)) in &merged.paths {
        for (method, operation) in item.operations() {
            let key = OperationKey::new(method, template);
            let parameters = effective_parameters(&item.parameters, &operation.parameters);
            let (properties, required) =
                collect_body(&parameters, &merged.definitions, key.as_str())?;

            let body = if parameters.iter().any(Parameter::is_body) {
                Some(
                    BodySchema::compile(&properties, &required).map_err(|details| {
                        CompileError::BodySchema {
                            operation: key.to_string(),
                            details,
                        }
                    })?,
                )
            } else {
                None
            };

            let resolved = ResolvedOperation {
                key: key.clone(),
                method,
                template: template.clone(),
                base_path: base_path.clone(),
                operation_id: operation.operation_id.clone(),
                properties,
                required,
                parameters,
                body,
            };
            entries.push(RegistryEntry::new(Arc::new(resolved)));
        }
    }

    let registry = Registry::from_entries(entries);
    tracing::info!(
        documents = documents.len(),
        operations = registry.len(),
        "compiled API description"
    );
    Ok(registry)
}

/// Compile a single document
pub fn compile_document(document: &Document) -> Result<Registry> {
    compile(std::slice::from_ref(document))
}

/// Load documents from disk, in order, and compile them
pub async fn compile_files(paths: &[PathBuf]) -> Result<Registry> {
    let documents = DocumentLoader::load_all(paths).await?;
    compile(&documents)
}

/// Path-level parameters followed by operation parameters; an operation
/// parameter replaces a path-level one with the same name and location.
fn effective_parameters(shared: &[Parameter], own: &[Parameter]) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = shared
        .iter()
        .filter(|p| {
            !own.iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .cloned()
        .collect();
    parameters.extend(own.iter().cloned());
    parameters
}

/// Fold all body parameters into one properties map and one required list
fn collect_body(
    parameters: &[Parameter],
    definitions: &Map<String, Value>,
    context: &str,
) -> Result<(Map<String, Value>, Vec<String>)> {
    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for parameter in parameters.iter().filter(|p| p.is_body()) {
        let Some(schema) = &parameter.schema else {
            continue;
        };
        let resolved = resolve_refs(schema, definitions, &mut Vec::new(), context)?;

        if let Some(Value::Object(props)) = resolved.get("properties") {
            for (name, property) in props {
                if !properties.contains_key(name) {
                    properties.insert(name.clone(), property.clone());
                }
            }
        }

        if let Some(Value::Array(names)) = resolved.get("required") {
            for name in names.iter().filter_map(Value::as_str) {
                if !required.iter().any(|r| r == name) {
                    required.push(name.to_string());
                }
            }
        }
    }

    Ok((properties, required))
}

/// Inline every `$ref` in `schema`, transitively
pub fn resolve_refs(
    schema: &Value,
    definitions: &Map<String, Value>,
    visiting: &mut Vec<String>,
    context: &str,
) -> Result<Value> {
    match schema {
        Value::Object(object) => {
            if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
                let name = definition_name(reference)?;
                if visiting.iter().any(|v| v == name) {
                    return Err(CompileError::CyclicRef {
                        reference: reference.to_string(),
                        context: context.to_string(),
                    });
                }
                let target =
                    definitions
                        .get(name)
                        .ok_or_else(|| CompileError::UnresolvedRef {
                            reference: reference.to_string(),
                            context: context.to_string(),
                        })?;

                visiting.push(name.to_string());
                let resolved = resolve_refs(target, definitions, visiting, context);
                visiting.pop();
                return resolved;
            }

            let mut resolved = Map::with_capacity(object.len());
            for (key, value) in object {
                // Literal data, not schemas
                if matches!(key.as_str(), "enum" | "example" | "default") {
                    resolved.insert(key.clone(), value.clone());
                } else {
                    resolved.insert(
                        key.clone(),
                        resolve_refs(value, definitions, visiting, context)?,
                    );
                }
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(values) => values
            .iter()
            .map(|value| resolve_refs(value, definitions, visiting, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn definition_name(reference: &str) -> Result<&str> {
    reference
        .strip_prefix(DEFINITIONS_PREFIX)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| CompileError::MalformedRef {
            reference: reference.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Operation, ParamType};
    use serde_json::json;

    fn pet_definitions() -> Map<String, Value> {
        json!({
            "Pet": {
                "properties": {
                    "name": {"type": "string"},
                    "owner": {"$ref": "#/definitions/Owner"}
                },
                "required": ["name"]
            },
            "Owner": {
                "properties": {"email": {"type": "string"}},
                "required": ["email"]
            }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_resolve_refs_transitively() {
        let definitions = pet_definitions();
        let resolved = resolve_refs(
            &json!({"$ref": "#/definitions/Pet"}),
            &definitions,
            &mut Vec::new(),
            "test",
        )
        .unwrap();

        assert_eq!(
            resolved["properties"]["owner"]["properties"]["email"]["type"],
            "string"
        );
        assert_eq!(resolved["required"], json!(["name"]));
    }

    #[test]
    fn test_unresolvable_ref_fails() {
        let doc = Document::builder()
            .operation(
                "/pets",
                HttpMethod::Post,
                Operation::new().parameter(Parameter::body_ref("pet", "Missing")),
            )
            .build();

        match compile_document(&doc) {
            Err(CompileError::UnresolvedRef { reference, context }) => {
                assert_eq!(reference, "#/definitions/Missing");
                assert_eq!(context, "post/pets");
            }
            other => panic!("Expected UnresolvedRef, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_cyclic_ref_fails() {
        let doc = Document::builder()
            .operation(
                "/nodes",
                HttpMethod::Post,
                Operation::new().parameter(Parameter::body_ref("node", "Node")),
            )
            .definition(
                "Node",
                json!({"properties": {"child": {"$ref": "#/definitions/Node"}}}),
            )
            .build();

        assert!(matches!(
            compile_document(&doc),
            Err(CompileError::CyclicRef { .. })
        ));
    }

    #[test]
    fn test_malformed_ref_fails() {
        let definitions = Map::new();
        let result = resolve_refs(
            &json!({"$ref": "other.json#/Pet"}),
            &definitions,
            &mut Vec::new(),
            "test",
        );
        assert!(matches!(result, Err(CompileError::MalformedRef { .. })));
    }

    #[test]
    fn test_body_parameters_merge_first_wins() {
        let doc = Document::builder()
            .operation(
                "/pets",
                HttpMethod::Post,
                Operation::new()
                    .parameter(Parameter::body(
                        "a",
                        json!({
                            "properties": {"id": {"type": "integer"}},
                            "required": ["id"]
                        }),
                    ))
                    .parameter(Parameter::body(
                        "b",
                        json!({
                            "properties": {
                                "id": {"type": "string"},
                                "name": {"type": "string"}
                            },
                            "required": ["id", "name"]
                        }),
                    )),
            )
            .build();

        let registry = compile_document(&doc).unwrap();
        let entry = registry.get("post/pets").unwrap();
        let op = &entry.operation;

        assert_eq!(op.properties["id"]["type"], "integer");
        assert_eq!(op.properties["name"]["type"], "string");
        assert_eq!(op.required, vec!["id".to_string(), "name".to_string()]);
        assert!(op.body.is_some());
    }

    #[test]
    fn test_query_parameters_not_folded_into_properties() {
        let doc = Document::builder()
            .operation(
                "/pets",
                HttpMethod::Get,
                Operation::new()
                    .parameter(Parameter::query("limit", ParamType::Integer).required()),
            )
            .build();

        let registry = compile_document(&doc).unwrap();
        let op = &registry.get("get/pets").unwrap().operation;
        assert!(op.properties.is_empty());
        assert!(op.required.is_empty());
        assert!(op.body.is_none());
        assert_eq!(op.request_parameters().count(), 1);
    }

    #[test]
    fn test_merge_later_documents_win() {
        let first = Document::builder()
            .base_path("/v1")
            .operation("/pets", HttpMethod::Get, Operation::new().operation_id("old"))
            .operation("/owners", HttpMethod::Get, Operation::new())
            .definition("Pet", json!({"properties": {}}))
            .build();
        let second = Document::builder()
            .base_path("/v2")
            .operation("/pets", HttpMethod::Get, Operation::new().operation_id("new"))
            .definition("Pet", json!({"properties": {"x": {}}}))
            .build();

        let merged = merge_documents(&[first, second]);
        let (base_path, item) = &merged.paths["/pets"];
        assert_eq!(base_path, "/v2");
        assert_eq!(
            item.get.as_ref().unwrap().operation_id.as_deref(),
            Some("new")
        );
        assert_eq!(merged.paths["/owners"].0, "/v1");
        assert!(merged.definitions["Pet"]["properties"].get("x").is_some());
    }

    #[tokio::test]
    async fn test_compile_files_reports_load_errors() {
        match compile_files(&[PathBuf::from("/nonexistent/swagger.json")]).await {
            Err(CompileError::Load(crate::error::LoadError::Io { path, .. })) => {
                assert_eq!(path, PathBuf::from("/nonexistent/swagger.json"));
            }
            other => panic!("Expected load error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_path_level_parameters_are_inherited() {
        let mut doc = Document::builder()
            .operation(
                "/pets/{id}",
                HttpMethod::Get,
                Operation::new().parameter(Parameter::query("verbose", ParamType::Boolean)),
            )
            .build();
        doc.paths
            .get_mut("/pets/{id}")
            .unwrap()
            .parameters
            .push(Parameter::path("id", ParamType::Integer));

        let registry = compile_document(&doc).unwrap();
        let op = &registry.get("get/pets/{id}").unwrap().operation;
        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "verbose"]);
    }
}
