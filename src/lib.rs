//! # validate-api Library
//!
//! Compiles static API description documents (paths, operations, parameter
//! and body schemas) into an immutable registry and validates HTTP requests
//! against it, reporting each failure as a message plus a `#`-rooted JSON
//! pointer.
//!
//! ```ignore
//! let documents = DocumentLoader::load_all(&paths).await?;
//! registry::global().publish(compile(&documents)?);
//!
//! let request = ApiRequest::new("GET", "/api/pets?limit=10");
//! match ValidationEngine::global().validate(&request) {
//!     ValidationOutcome::Ok => { /* forward */ }
//!     outcome => { /* reject */ }
//! }
//! ```

pub mod body;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod matcher;
pub mod middleware;
pub mod output;
pub mod params;
pub mod registry;
pub mod request;
pub mod validator;

pub use body::BodySchema;
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use compiler::{ResolvedOperation, compile, compile_document, compile_files, merge_documents};
pub use config::{Config, ConfigError, ConfigManager};
pub use document::{
    CollectionFormat, Document, DocumentBuilder, DocumentLoader, HttpMethod, Items, Operation,
    ParamLocation, ParamType, Parameter, PathItem,
};
pub use error::{CompileError, LoadError};
pub use matcher::{OperationMatch, find_operation};
pub use middleware::{AlreadyValidated, ValidationLayer, validate_request};
pub use output::Output;
pub use params::{validate_params, validate_typed_params};
pub use registry::{OperationKey, Registry, RegistryEntry, RegistryHandle};
pub use request::{ApiRequest, decode_query, split_path};
pub use validator::{ValidationEngine, ValidationOutcome, Violation, validate, validate_body};
