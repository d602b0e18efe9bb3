//! Description document model and loading
//!
//! A description document is the static, already-generated API schema this
//! engine consumes: a `basePath`, a `paths` table of operations and a
//! `definitions` table of named object schemas. Documents are read from JSON
//! or YAML files, or assembled in code with the builder methods below.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadResult};

/// HTTP verbs an operation can be declared under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    /// Lower-case verb as used in registry keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamLocation {
    #[serde(rename = "path")]
    Path,
    #[serde(rename = "query")]
    Query,
    #[serde(rename = "body")]
    Body,
    #[serde(rename = "header")]
    Header,
    #[serde(rename = "formData")]
    FormData,
}

/// Declared primitive type of a non-body parameter or array item.
///
/// Unknown type names fail deserialization, so a misspelled type is a
/// configuration error rather than a silently skipped check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    File,
}

impl ParamType {
    /// Capitalized name used in "Type mismatch" messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ParamType::String => "String",
            ParamType::Integer => "Integer",
            ParamType::Number => "Number",
            ParamType::Boolean => "Boolean",
            ParamType::Array => "Array",
            ParamType::Object => "Object",
            ParamType::File => "File",
        }
    }
}

/// How the elements of an array parameter are joined in a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    #[default]
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// Repeated keys; the value is already a list
    Multi,
}

impl CollectionFormat {
    pub fn separator(&self) -> Option<char> {
        match self {
            CollectionFormat::Csv => Some(','),
            CollectionFormat::Ssv => Some(' '),
            CollectionFormat::Tsv => Some('\t'),
            CollectionFormat::Pipes => Some('|'),
            CollectionFormat::Multi => None,
        }
    }
}

/// Element descriptor of an array parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Items {
    #[serde(rename = "type")]
    pub item_type: ParamType,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Items>>,
    #[serde(
        rename = "collectionFormat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_format: Option<CollectionFormat>,
}

impl Items {
    pub fn of(item_type: ParamType) -> Self {
        Self {
            item_type,
            enum_values: None,
            items: None,
            collection_format: None,
        }
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// One declared operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParamType>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(
        rename = "collectionFormat",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_format: Option<CollectionFormat>,
    /// Body schema, either inline or a `$ref` into `definitions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    fn new(name: impl Into<String>, location: ParamLocation, param_type: Option<ParamType>) -> Self {
        Self {
            name: name.into(),
            location,
            param_type,
            required: false,
            enum_values: None,
            items: None,
            collection_format: None,
            schema: None,
            description: None,
        }
    }

    pub fn query(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParamLocation::Query, Some(param_type))
    }

    /// Path parameters are always required
    pub fn path(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParamLocation::Path, Some(param_type)).required()
    }

    pub fn body(name: impl Into<String>, schema: Value) -> Self {
        let mut param = Self::new(name, ParamLocation::Body, None);
        param.schema = Some(schema);
        param
    }

    /// Body parameter whose schema is `#/definitions/{definition}`
    pub fn body_ref(name: impl Into<String>, definition: &str) -> Self {
        Self::body(
            name,
            serde_json::json!({ "$ref": format!("#/definitions/{}", definition) }),
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_items(mut self, items: Items) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = Some(format);
        self
    }

    pub fn is_body(&self) -> bool {
        self.location == ParamLocation::Body
    }

    /// Path and query parameters are checked by the parameter validator
    pub fn is_path_or_query(&self) -> bool {
        matches!(self.location, ParamLocation::Path | ParamLocation::Query)
    }
}

/// Metadata for one (method, path template) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Operations declared under one path template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// Parameters shared by every operation under this template
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
        }
    }

    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Patch => &mut self.patch,
        }
    }

    /// Declared operations in a fixed verb order
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |method| self.operation(method).map(|op| (method, op)))
    }
}

/// A complete API description document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "basePath", default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    #[serde(default)]
    pub definitions: Map<String, Value>,
}

impl Document {
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// Assembles a [`Document`] in code
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.document.base_path = Some(base_path.into());
        self
    }

    pub fn operation(
        mut self,
        template: impl Into<String>,
        method: HttpMethod,
        operation: Operation,
    ) -> Self {
        let item = self.document.paths.entry(template.into()).or_default();
        *item.slot(method) = Some(operation);
        self
    }

    pub fn definition(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.document.definitions.insert(name.into(), schema);
        self
    }

    pub fn build(self) -> Document {
        self.document
    }
}

/// Supported on-disk document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

/// Reads description documents from the filesystem
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load a single document, choosing the parser by file extension
    pub async fn load(path: &Path) -> LoadResult<Document> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::parse(path, &content)
    }

    /// Load documents in order; the order is the merge precedence order
    pub async fn load_all(paths: &[PathBuf]) -> LoadResult<Vec<Document>> {
        if paths.is_empty() {
            return Err(LoadError::NoDocuments);
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            documents.push(Self::load(path).await?);
        }
        Ok(documents)
    }

    pub fn parse(path: &Path, content: &str) -> LoadResult<Document> {
        match DocumentFormat::from_path(path) {
            Some(DocumentFormat::Json) => {
                serde_json::from_str(content).map_err(|source| LoadError::Json {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Some(DocumentFormat::Yaml) => {
                serde_yaml::from_str(content).map_err(|source| LoadError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None if path.extension().is_some() => Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
            None => {
                // No extension: JSON first, then YAML
                if let Ok(document) = serde_json::from_str::<Document>(content) {
                    Ok(document)
                } else {
                    serde_yaml::from_str(content).map_err(|source| LoadError::Yaml {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }
}
