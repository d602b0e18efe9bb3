//! Request abstraction handed to the validator
//!
//! HTTP layers build an [`ApiRequest`] from whatever request type they use:
//! the method, percent-decoded path segments, a nested parameter map and an
//! already-decoded body.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

/// One inbound request, reduced to what validation needs
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: String,
    /// Request path as received, used in not-found reports
    pub path: String,
    pub path_segments: Vec<String>,
    /// Query and path parameters; bracketed names nest (`a[b]=c`)
    pub params: Map<String, Value>,
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Build from a method and a request target (`/path?query`)
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        Self {
            method: method.into(),
            path: path.to_string(),
            path_segments: split_path(path),
            params: query.map(decode_query).unwrap_or_default(),
            body: None,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Split a request path into percent-decoded segments
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect()
}

/// Decode a query string into a nested parameter map.
///
/// `a=1` gives a string, repeated keys and `a[]=` give a list, and
/// `a[b]=1` nests an object under `a`.
pub fn decode_query(query: &str) -> Map<String, Value> {
    let mut params = Map::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let keys = key_path(&key);
        let Some((first, rest)) = keys.split_first() else {
            continue;
        };
        insert_nested(&mut params, first, rest, Value::String(value.into_owned()));
    }

    params
}

/// `filter[route][]` -> `["filter", "route", ""]`
pub fn key_path(name: &str) -> Vec<&str> {
    let Some(open) = name.find('[') else {
        return vec![name];
    };

    let mut keys = vec![&name[..open]];
    let mut rest = &name[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                keys.push(&stripped[..close]);
                rest = &stripped[close + 1..];
            }
            None => break,
        }
    }
    keys
}

fn insert_nested(map: &mut Map<String, Value>, key: &str, rest: &[&str], value: Value) {
    match rest.split_first() {
        None => match map.get_mut(key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                map.insert(key.to_string(), value);
            }
        },
        Some((&"", _)) => {
            let slot = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(values) => values.push(value),
                other => {
                    let previous = other.take();
                    *other = Value::Array(vec![previous, value]);
                }
            }
        }
        Some((next, remaining)) => {
            let slot = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_nested(inner, next, remaining, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_splits_path_and_query() {
        let request = ApiRequest::new("GET", "/api/pets?limit=10&offset=100");
        assert_eq!(request.path, "/api/pets");
        assert_eq!(request.path_segments, vec!["api", "pets"]);
        assert_eq!(request.params["limit"], "10");
        assert_eq!(request.params["offset"], "100");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_split_path_percent_decodes() {
        assert_eq!(
            split_path("/pets/hello%20world/%7Bid%7D"),
            vec!["pets", "hello world", "{id}"]
        );
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn test_decode_query_nested_and_lists() {
        let params = decode_query("filter%5Broute%5D=north&tags[]=a&tags[]=b&id=1&id=2&q=a+b");
        assert_eq!(
            Value::Object(params),
            json!({
                "filter": {"route": "north"},
                "tags": ["a", "b"],
                "id": ["1", "2"],
                "q": "a b"
            })
        );
    }

    #[test]
    fn test_key_path() {
        assert_eq!(key_path("limit"), vec!["limit"]);
        assert_eq!(key_path("filter[route]"), vec!["filter", "route"]);
        assert_eq!(key_path("a[b][]"), vec!["a", "b", ""]);
        assert_eq!(key_path("broken[x"), vec!["broken"]);
    }

    #[test]
    fn test_builder_methods() {
        let request = ApiRequest::new("post", "/pets")
            .with_param("limit", 10)
            .with_body(json!({"id": 1}));
        assert_eq!(request.params["limit"], 10);
        assert_eq!(request.body, Some(json!({"id": 1})));
    }
}
