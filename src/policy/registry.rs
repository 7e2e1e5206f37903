//! # Policy Registry
//!
//! Shared, read-mostly collection of registered source policies.
//!
//! ## Overview
//!
//! The registry hands out snapshots: iteration during policy application
//! tolerates concurrent registration and removal because each message works
//! against the copy taken at the start of its policy pass. Registration
//! order is preserved and determines attachment order on the event.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use super::SourcePolicy;

/// Registry of source policies with snapshot iteration semantics.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: RwLock<Vec<Arc<dyn SourcePolicy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy at the end of the registration order.
    pub fn register(&self, policy: Arc<dyn SourcePolicy>) {
        debug!(policy = policy.name(), "Registered source policy");
        self.policies.write().push(policy);
    }

    /// Remove a policy by name. Returns whether one was removed.
    pub fn remove(&self, name: &str) -> bool {
        let mut policies = self.policies.write();
        let before = policies.len();
        policies.retain(|p| p.name() != name);
        let removed = policies.len() < before;
        if removed {
            debug!(policy = name, "Removed source policy");
        }
        removed
    }

    /// Snapshot of the registered policies in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn SourcePolicy>> {
        self.policies.read().clone()
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}
