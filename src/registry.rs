//! Operation registry
//!
//! The registry is an immutable snapshot built by the compiler. A
//! [`RegistryHandle`] publishes snapshots atomically: readers clone an `Arc`
//! to the current snapshot and never observe a half-built registry, while a
//! reload swaps the whole snapshot in one step.

use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::compiler::ResolvedOperation;
use crate::document::HttpMethod;

/// Registry key: lower-case method followed by the path template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct OperationKey(String);

impl OperationKey {
    pub fn new(method: HttpMethod, template: &str) -> Self {
        Self(format!("{}{}", method.as_str(), template))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    /// `{name}`; matches any single request segment
    Param(String),
}

impl TemplateSegment {
    fn parse(segment: &str) -> Self {
        if segment.starts_with('{') {
            let name = segment.trim_start_matches('{').trim_end_matches('}');
            TemplateSegment::Param(name.to_string())
        } else {
            TemplateSegment::Literal(segment.to_string())
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, TemplateSegment::Param(_))
    }
}

/// Split a path on `/`, dropping empty segments
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// A compiled operation together with its pre-split match data
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: OperationKey,
    pub base_segments: Vec<String>,
    pub template_segments: Vec<TemplateSegment>,
    pub operation: Arc<ResolvedOperation>,
}

impl RegistryEntry {
    pub fn new(operation: Arc<ResolvedOperation>) -> Self {
        Self {
            key: operation.key.clone(),
            base_segments: path_segments(&operation.base_path),
            template_segments: path_segments(&operation.template)
                .iter()
                .map(|segment| TemplateSegment::parse(segment))
                .collect(),
            operation,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.operation.method
    }

    pub fn base_path(&self) -> &str {
        &self.operation.base_path
    }

    /// Literal segments sort before placeholders position by position, so a
    /// concrete route is always tried before a templated one it overlaps.
    fn match_order(&self) -> (Vec<bool>, Reverse<usize>, &OperationKey) {
        (
            self.template_segments
                .iter()
                .map(TemplateSegment::is_param)
                .collect(),
            Reverse(self.base_segments.len()),
            &self.key,
        )
    }
}

/// Immutable table of compiled operations, in match order
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    index: HashMap<OperationKey, usize>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry; a later entry replaces an earlier one with the same key
    pub fn from_entries(entries: Vec<RegistryEntry>) -> Self {
        let mut by_key: HashMap<OperationKey, RegistryEntry> = HashMap::new();
        for entry in entries {
            by_key.insert(entry.key.clone(), entry);
        }

        let mut entries: Vec<RegistryEntry> = by_key.into_values().collect();
        entries.sort_by(|a, b| a.match_order().cmp(&b.match_order()));

        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.key.clone(), position))
            .collect();

        Self { entries, index }
    }

    /// New registry holding these entries plus `other`'s; `other` wins on key
    /// collision and unrelated keys are kept.
    pub fn merged_with(&self, other: &Registry) -> Registry {
        let entries = self
            .entries
            .iter()
            .chain(other.entries.iter())
            .cloned()
            .collect();
        Registry::from_entries(entries)
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.index
            .get(&OperationKey(key.to_string()))
            .map(|&position| &self.entries[position])
    }

    /// Entries in match order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Operation keys in match order
    pub fn operations(&self) -> impl Iterator<Item = &OperationKey> {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared, atomically replaceable reference to the current registry
#[derive(Clone, Default)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<Registry>>>,
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("operations", &self.snapshot().len())
            .finish()
    }
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    /// Current snapshot; stays valid even if a reload happens meanwhile
    pub fn snapshot(&self) -> Arc<Registry> {
        self.current.read().clone()
    }

    /// Replace the whole registry
    pub fn publish(&self, registry: Registry) {
        let operations = registry.len();
        *self.current.write() = Arc::new(registry);
        tracing::debug!(operations, "published registry snapshot");
    }

    /// Overlay `registry` onto the current snapshot (copy-and-swap)
    pub fn extend(&self, registry: Registry) {
        let mut current = self.current.write();
        let merged = current.merged_with(&registry);
        tracing::debug!(operations = merged.len(), "extended registry snapshot");
        *current = Arc::new(merged);
    }

    /// Drop every operation
    pub fn clear(&self) {
        *self.current.write() = Arc::new(Registry::empty());
    }
}

static GLOBAL_REGISTRY: OnceLock<RegistryHandle> = OnceLock::new();

/// Process-wide registry used by hosts that compile once at startup
pub fn global() -> &'static RegistryHandle {
    GLOBAL_REGISTRY.get_or_init(RegistryHandle::default)
}
