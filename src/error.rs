use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning description documents into a registry.
///
/// Every variant is a configuration error: a process must not accept traffic
/// with a schema that failed to compile.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unresolvable reference: {reference} (in {context})")]
    UnresolvedRef { reference: String, context: String },

    #[error("Cyclic reference: {reference} (in {context})")]
    CyclicRef { reference: String, context: String },

    #[error("Malformed reference: {reference} - only #/definitions/<name> is supported")]
    MalformedRef { reference: String },

    #[error("Malformed document: {details}")]
    MalformedDocument { details: String },

    #[error("Body schema for {operation} does not compile: {details}")]
    BodySchema { operation: String, details: String },

    #[error("Document load error: {0}")]
    Load(#[from] LoadError),
}

/// Errors raised while reading description documents from disk.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {path} - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {path} - {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML parsing error: {path} - {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported document format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("No description documents supplied")]
    NoDocuments,
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::MalformedDocument {
            details: err.to_string(),
        }
    }
}

/// Result type alias for compilation
pub type Result<T> = std::result::Result<T, CompileError>;

/// Load result type alias
pub type LoadResult<T> = std::result::Result<T, LoadError>;
