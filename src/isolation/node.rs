//! Artifact nodes of the isolation tree.
//!
//! A node owns its local class and resource definitions, exports a subset of
//! them to children, and resolves lookups through its [`ClassLookupPolicy`]:
//! parent-first packages delegate up before consulting local definitions,
//! child-first packages shadow the parent. Parent delegation is always
//! filtered — only exported definitions are visible from below.

use std::collections::HashSet;
use std::sync::Arc;

use super::errors::IsolationError;
use super::lookup::{package_of, ClassLookupPolicy, LookupStrategy};

/// A class definition resolved to the artifact that provides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClass {
    class_name: String,
    artifact: String,
}

impl ResolvedClass {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Name of the artifact node whose definition won the lookup.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

/// A resource resolved to the artifact that provides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    resource: String,
    artifact: String,
}

impl ResolvedResource {
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

/// Upward delegation target of a node: what a parent exposes to children.
pub trait ClassResolver: Send + Sync {
    fn artifact_name(&self) -> &str;

    fn resolve_exported_class(&self, class_name: &str) -> Option<ResolvedClass>;

    fn resolve_exported_resource(&self, resource: &str) -> Option<ResolvedResource>;
}

/// One artifact node in the isolation tree.
///
/// Mutable while the tree is being assembled; publishing the node behind an
/// `Arc` freezes it for concurrent resolution.
pub struct ArtifactClassRegistry {
    name: String,
    lookup_policy: ClassLookupPolicy,
    classes: HashSet<String>,
    resources: HashSet<String>,
    exported_packages: HashSet<String>,
    exported_resources: HashSet<String>,
    parent: Option<Arc<dyn ClassResolver>>,
}

impl ArtifactClassRegistry {
    pub fn new(
        name: impl Into<String>,
        lookup_policy: ClassLookupPolicy,
        parent: Option<Arc<dyn ClassResolver>>,
    ) -> Self {
        Self {
            name: name.into(),
            lookup_policy,
            classes: HashSet::new(),
            resources: HashSet::new(),
            exported_packages: HashSet::new(),
            exported_resources: HashSet::new(),
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_class(&mut self, class_name: impl Into<String>) {
        self.classes.insert(class_name.into());
    }

    pub fn add_classes(&mut self, class_names: impl IntoIterator<Item = String>) {
        self.classes.extend(class_names);
    }

    pub fn add_resource(&mut self, resource: impl Into<String>) {
        self.resources.insert(resource.into());
    }

    pub fn add_resources(&mut self, resources: impl IntoIterator<Item = String>) {
        self.resources.extend(resources);
    }

    pub fn export_packages(&mut self, packages: impl IntoIterator<Item = String>) {
        self.exported_packages.extend(packages);
    }

    pub fn export_resources(&mut self, resources: impl IntoIterator<Item = String>) {
        self.exported_resources.extend(resources);
    }

    /// Freeze the node for shared, read-only resolution.
    pub fn publish(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Resolve a class through this node's lookup policy.
    pub fn resolve_class(&self, class_name: &str) -> Result<ResolvedClass, IsolationError> {
        let resolved = match self.lookup_policy.strategy_for(class_name) {
            LookupStrategy::ParentFirst => self
                .parent_class(class_name)
                .or_else(|| self.local_class(class_name)),
            LookupStrategy::ChildFirst => self
                .local_class(class_name)
                .or_else(|| self.parent_class(class_name)),
        };
        resolved.ok_or_else(|| IsolationError::class_not_found(class_name, &self.name))
    }

    /// Resolve a resource through this node's lookup policy.
    pub fn resolve_resource(&self, resource: &str) -> Result<ResolvedResource, IsolationError> {
        let resolved = self
            .local_resource(resource)
            .or_else(|| self.parent_resource(resource));
        resolved.ok_or_else(|| IsolationError::resource_not_found(resource, &self.name))
    }

    fn local_class(&self, class_name: &str) -> Option<ResolvedClass> {
        self.classes.contains(class_name).then(|| ResolvedClass {
            class_name: class_name.to_string(),
            artifact: self.name.clone(),
        })
    }

    fn parent_class(&self, class_name: &str) -> Option<ResolvedClass> {
        self.parent.as_ref()?.resolve_exported_class(class_name)
    }

    fn local_resource(&self, resource: &str) -> Option<ResolvedResource> {
        self.resources.contains(resource).then(|| ResolvedResource {
            resource: resource.to_string(),
            artifact: self.name.clone(),
        })
    }

    fn parent_resource(&self, resource: &str) -> Option<ResolvedResource> {
        self.parent.as_ref()?.resolve_exported_resource(resource)
    }

    fn is_package_exported(&self, class_name: &str) -> bool {
        self.exported_packages.contains(package_of(class_name))
    }
}

impl ClassResolver for ArtifactClassRegistry {
    fn artifact_name(&self) -> &str {
        &self.name
    }

    fn resolve_exported_class(&self, class_name: &str) -> Option<ResolvedClass> {
        if self.is_package_exported(class_name) {
            if let Some(found) = self.local_class(class_name) {
                return Some(found);
            }
        }
        // Visibility is transitive: what our own parent exports is visible
        // to our children as well.
        self.parent_class(class_name)
    }

    fn resolve_exported_resource(&self, resource: &str) -> Option<ResolvedResource> {
        if self.exported_resources.contains(resource) {
            if let Some(found) = self.local_resource(resource) {
                return Some(found);
            }
        }
        self.parent_resource(resource)
    }
}

/// Ordered first-match delegation across several providers; used as the
/// application node's parent so it sees the container and every plugin.
pub struct CompositeResolver {
    name: String,
    delegates: Vec<Arc<dyn ClassResolver>>,
}

impl CompositeResolver {
    pub fn new(name: impl Into<String>, delegates: Vec<Arc<dyn ClassResolver>>) -> Self {
        Self {
            name: name.into(),
            delegates,
        }
    }
}

impl ClassResolver for CompositeResolver {
    fn artifact_name(&self) -> &str {
        &self.name
    }

    fn resolve_exported_class(&self, class_name: &str) -> Option<ResolvedClass> {
        self.delegates
            .iter()
            .find_map(|delegate| delegate.resolve_exported_class(class_name))
    }

    fn resolve_exported_resource(&self, resource: &str) -> Option<ResolvedResource> {
        self.delegates
            .iter()
            .find_map(|delegate| delegate.resolve_exported_resource(resource))
    }
}
