//! Operation matching
//!
//! Registry entries are already in match order (literal segments before
//! placeholders), so the first entry that fits a request is the answer.

use serde_json::{Map, Value};

use crate::registry::{Registry, RegistryEntry, TemplateSegment};

/// A matched entry and the values bound to its `{placeholder}` segments
#[derive(Debug, Clone)]
pub struct OperationMatch<'r> {
    pub entry: &'r RegistryEntry,
    pub path_params: Map<String, Value>,
}

/// Find the operation serving `method` on the given path segments
pub fn find_operation<'r, S: AsRef<str>>(
    registry: &'r Registry,
    method: &str,
    segments: &[S],
) -> Option<OperationMatch<'r>> {
    registry
        .entries()
        .iter()
        .filter(|entry| entry.method().as_str().eq_ignore_ascii_case(method))
        .find_map(|entry| {
            match_entry(entry, segments).map(|path_params| OperationMatch { entry, path_params })
        })
}

fn match_entry<S: AsRef<str>>(entry: &RegistryEntry, segments: &[S]) -> Option<Map<String, Value>> {
    let base = &entry.base_segments;
    if segments.len() < base.len()
        || !base
            .iter()
            .zip(segments)
            .all(|(expected, actual)| expected == actual.as_ref())
    {
        return None;
    }

    let rest = &segments[base.len()..];
    if rest.len() != entry.template_segments.len() {
        return None;
    }

    let mut path_params = Map::new();
    for (template, actual) in entry.template_segments.iter().zip(rest) {
        match template {
            TemplateSegment::Literal(literal) if literal == actual.as_ref() => {}
            TemplateSegment::Literal(_) => return None,
            TemplateSegment::Param(name) => {
                path_params.insert(name.clone(), Value::String(actual.as_ref().to_string()));
            }
        }
    }

    Some(path_params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_document;
    use crate::document::{Document, HttpMethod, Operation};

    fn registry() -> Registry {
        let doc = Document::builder()
            .base_path("/api")
            .operation("/pets", HttpMethod::Get, Operation::new())
            .operation("/pets", HttpMethod::Post, Operation::new())
            .operation("/pets/{id}", HttpMethod::Get, Operation::new())
            .operation("/pets/cats", HttpMethod::Get, Operation::new())
            .operation("/owners/{owner}/pets/{id}", HttpMethod::Get, Operation::new())
            .build();
        compile_document(&doc).unwrap()
    }

    fn key(found: Option<OperationMatch<'_>>) -> Option<String> {
        found.map(|m| m.entry.key.to_string())
    }

    #[test]
    fn test_literal_route_beats_placeholder() {
        let registry = registry();
        assert_eq!(
            key(find_operation(&registry, "GET", &["api", "pets", "cats"])),
            Some("get/pets/cats".to_string())
        );
        assert_eq!(
            key(find_operation(&registry, "get", &["api", "pets", "dogs"])),
            Some("get/pets/{id}".to_string())
        );
    }

    #[test]
    fn test_method_selects_operation() {
        let registry = registry();
        assert_eq!(
            key(find_operation(&registry, "Post", &["api", "pets"])),
            Some("post/pets".to_string())
        );
        assert!(find_operation(&registry, "DELETE", &["api", "pets"]).is_none());
    }

    #[test]
    fn test_base_path_must_be_exact_prefix() {
        let registry = registry();
        assert!(find_operation(&registry, "GET", &["pets"]).is_none());
        assert!(find_operation(&registry, "GET", &["v2", "pets"]).is_none());
        let root: [&str; 0] = [];
        assert!(find_operation(&registry, "GET", &root).is_none());
    }

    #[test]
    fn test_lengths_must_match() {
        let registry = registry();
        assert!(find_operation(&registry, "GET", &["api", "pets", "1", "toys"]).is_none());
    }

    #[test]
    fn test_placeholders_are_captured() {
        let registry = registry();
        let found = find_operation(&registry, "GET", &["api", "owners", "7", "pets", "12"]).unwrap();
        assert_eq!(found.entry.key.as_str(), "get/owners/{owner}/pets/{id}");
        assert_eq!(found.path_params["owner"], "7");
        assert_eq!(found.path_params["id"], "12");
    }
}
