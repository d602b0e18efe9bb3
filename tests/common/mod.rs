//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use validate_api::{ApiRequest, Registry, ValidationOutcome, Violation, compile_files, validate};

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    /// Pets API, JSON
    pub fn petstore(&self) -> PathBuf {
        self.fixtures_dir.join("petstore.json")
    }

    /// Owners API, YAML, self-contained
    pub fn owners(&self) -> PathBuf {
        self.fixtures_dir.join("owners.yaml")
    }
}

pub async fn compile_fixtures(paths: &[PathBuf]) -> Registry {
    compile_files(paths).await.expect("fixtures compile")
}

pub async fn petstore_registry() -> Registry {
    compile_fixtures(&[TestFixtures::new().petstore()]).await
}

pub fn check(registry: &Registry, request: ApiRequest) -> ValidationOutcome {
    validate(registry, &request)
}

pub fn invalid(message: &str, path: &str) -> ValidationOutcome {
    ValidationOutcome::Invalid(Violation::new(message, path))
}
