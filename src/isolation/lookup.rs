//! Per-node class lookup policy.

use serde::{Deserialize, Serialize};

/// How one package prefix is resolved by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    /// Delegate to the parent before looking locally. Used for boot and API
    /// packages so the whole tree agrees on one definition.
    ParentFirst,
    /// Look locally before delegating. Local definitions shadow the
    /// parent's, keeping artifact-private dependencies contained.
    ChildFirst,
}

/// Ordered package-prefix rules; prefixes registered here resolve
/// parent-first, everything else child-first.
#[derive(Debug, Clone, Default)]
pub struct ClassLookupPolicy {
    parent_first_prefixes: Vec<String>,
}

impl ClassLookupPolicy {
    /// Policy with no parent-first packages: everything is child-first.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_first(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            parent_first_prefixes: prefixes.into_iter().collect(),
        }
    }

    pub fn add_parent_first(&mut self, prefix: impl Into<String>) {
        self.parent_first_prefixes.push(prefix.into());
    }

    pub fn parent_first_prefixes(&self) -> &[String] {
        &self.parent_first_prefixes
    }

    /// Strategy for a fully qualified class name; the first matching prefix
    /// wins.
    pub fn strategy_for(&self, class_name: &str) -> LookupStrategy {
        for prefix in &self.parent_first_prefixes {
            if Self::package_matches(prefix, class_name) {
                return LookupStrategy::ParentFirst;
            }
        }
        LookupStrategy::ChildFirst
    }

    fn package_matches(prefix: &str, class_name: &str) -> bool {
        class_name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Package portion of a fully qualified class name; empty for the default
/// package.
pub(crate) fn package_of(class_name: &str) -> &str {
    class_name
        .rsplit_once('.')
        .map(|(package, _)| package)
        .unwrap_or("")
}
