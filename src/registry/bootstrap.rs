//! Bootstrap registration of transformers from configured properties.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::InitialisationError;

/// Canonical prefix for transformer entries; custom keys register all the
/// same.
pub const CORE_TRANSFORMER_KEY_PREFIX: &str = "core.transformer.";

/// One configured bootstrap entry: key plus the declared transformer type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapEntry {
    key: String,
    type_name: String,
}

impl BootstrapEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Insertion-ordered, strongly-typed bootstrap property set.
#[derive(Debug, Clone, Default)]
pub struct BootstrapProperties {
    entries: Vec<BootstrapEntry>,
}

impl BootstrapProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry, replacing an existing one with the same key in place.
    pub fn set(&mut self, key: impl Into<String>, type_name: impl Into<String>) {
        let key = key.into();
        let type_name = type_name.into();
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.type_name = type_name,
            None => self.entries.push(BootstrapEntry { key, type_name }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.type_name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BootstrapEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Action a registry change notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    Added,
    Removed,
}

/// A transformer as registered during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTransformer {
    key: String,
    type_name: String,
}

impl RegisteredTransformer {
    pub fn new(key: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            type_name: type_name.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Observes transformer registration changes.
pub trait TransformerResolver: Send + Sync {
    fn transformer_change(&self, transformer: &RegisteredTransformer, action: RegistryAction);
}

/// Concurrent registry of transformers keyed by their bootstrap key.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: DashMap<String, RegisteredTransformer>,
    resolvers: RwLock<Vec<Arc<dyn TransformerResolver>>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resolver(&self, resolver: Arc<dyn TransformerResolver>) {
        self.resolvers.write().push(resolver);
    }

    /// Register a transformer and notify every resolver of the change.
    pub fn register_transformer(&self, transformer: RegisteredTransformer) {
        debug!(
            key = transformer.key(),
            type_name = transformer.type_name(),
            "Registered transformer"
        );
        self.transformers
            .insert(transformer.key().to_string(), transformer.clone());
        for resolver in self.resolvers.read().iter() {
            resolver.transformer_change(&transformer, RegistryAction::Added);
        }
    }

    pub fn lookup(&self, key: &str) -> Option<RegisteredTransformer> {
        self.transformers.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

/// Registers every configured bootstrap entry at artifact startup.
pub struct RegistryBootstrap {
    properties: BootstrapProperties,
}

impl RegistryBootstrap {
    pub fn new(properties: BootstrapProperties) -> Self {
        Self { properties }
    }

    /// Walk the configured entries in declaration order and register each
    /// one. A blank type name aborts startup.
    pub fn initialise(&self, registry: &TransformerRegistry) -> Result<(), InitialisationError> {
        for entry in self.properties.iter() {
            if entry.type_name().trim().is_empty() {
                return Err(InitialisationError::new(
                    "registry-bootstrap",
                    format!("transformer entry '{}' has a blank type name", entry.key()),
                ));
            }
            registry.register_transformer(RegisteredTransformer::new(
                entry.key(),
                entry.type_name(),
            ));
        }
        info!(
            transformers = self.properties.len(),
            "Registry bootstrap complete"
        );
        Ok(())
    }
}
