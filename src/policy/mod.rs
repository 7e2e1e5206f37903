//! # Source Policies
//!
//! Per-message interception wrappers around message-source invocations.
//!
//! ## Overview
//!
//! A [`SourcePolicy`] declares which message sources it applies to by
//! [`ComponentIdentifier`] and manufactures one [`PolicyInstance`] per
//! matching message. The instance runs its pre-hook before the flow routes
//! the event and is attached to the event's internal state so that
//! post-processing code can find it without a side channel.
//!
//! ## Lifecycle
//!
//! Instances are created at the start of processing one message, consulted
//! around route execution, and discarded with the event. They are never
//! shared across events, and applicability is recomputed per message from a
//! registry snapshot.

pub mod registry;

pub use registry::PolicyRegistry;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::event::Event;
use crate::messaging::MessagingError;

/// Namespace + name pair identifying a connector component, e.g.
/// `httpn:listener`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentIdentifier {
    namespace: String,
    name: String,
}

impl ComponentIdentifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for ComponentIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(format!("Invalid component identifier: {s}")),
        }
    }
}

/// Outcome of a policy pre-hook.
#[derive(Debug, Clone)]
pub enum SourcePolicyDecision {
    /// Continue processing with the given event.
    Proceed(Event),
    /// Stop before routing; the given event becomes the response.
    ShortCircuit(Event),
}

impl SourcePolicyDecision {
    pub fn event(&self) -> &Event {
        match self {
            Self::Proceed(event) | Self::ShortCircuit(event) => event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Self::Proceed(event) | Self::ShortCircuit(event) => event,
        }
    }

    pub fn proceeds(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}

type SourcePreHook =
    dyn Fn(Event) -> Result<SourcePolicyDecision, MessagingError> + Send + Sync;

/// One policy application to one in-flight message.
pub struct PolicyInstance {
    policy_name: String,
    source: ComponentIdentifier,
    pre_hook: Box<SourcePreHook>,
    attached_event: Mutex<Option<Event>>,
}

impl PolicyInstance {
    pub fn new(
        policy_name: impl Into<String>,
        source: ComponentIdentifier,
        pre_hook: impl Fn(Event) -> Result<SourcePolicyDecision, MessagingError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            policy_name: policy_name.into(),
            source,
            pre_hook: Box::new(pre_hook),
            attached_event: Mutex::new(None),
        }
    }

    /// Run the pre-hook before the underlying route executes.
    pub fn process_source_pre(
        &self,
        event: Event,
    ) -> Result<SourcePolicyDecision, MessagingError> {
        (self.pre_hook)(event)
    }

    /// Attach the hook's result event for post-processing lookups.
    pub fn attach_event(&self, event: Event) {
        *self.attached_event.lock() = Some(event);
    }

    pub fn attached_event(&self) -> Option<Event> {
        self.attached_event.lock().clone()
    }

    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    pub fn source(&self) -> &ComponentIdentifier {
        &self.source
    }
}

impl fmt::Debug for PolicyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyInstance")
            .field("policy_name", &self.policy_name)
            .field("source", &self.source)
            .field("attached", &self.attached_event.lock().is_some())
            .finish()
    }
}

/// A policy that can wrap message-source invocations.
pub trait SourcePolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this policy applies to the given source component.
    ///
    /// Recomputed per message; extended matchers may consult event content,
    /// so results must not be cached across messages.
    fn applies_to_source(&self, identifier: &ComponentIdentifier) -> bool;

    /// Create the per-message instance for a matching source.
    fn create_source_policy_instance(
        &self,
        identifier: &ComponentIdentifier,
    ) -> Arc<PolicyInstance>;
}
