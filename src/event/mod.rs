//! # Event Envelope
//!
//! The message envelope that flows through the processing pipeline.
//!
//! ## Overview
//!
//! An [`Event`] wraps a [`Message`] (payload plus attributes) together with the
//! [`EventContext`] that identifies one processing run, a set of flow
//! variables, and the policy instances attached while the message is in
//! flight. Events are immutable per processing step: every transformation goes
//! through [`EventBuilder`], which produces a new event sharing the unmodified
//! parts of the previous one.
//!
//! ## Invariants
//!
//! - The context (and with it the correlation id) is preserved across all
//!   builder derivations within one processing run: [`Event::to_builder`]
//!   never replaces the context.
//! - Attached policy instances accumulate in attachment order.
//!
//! ## Usage
//!
//! ```rust
//! use flowgate_core::event::{Event, EventContext, Message};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let context = Arc::new(EventContext::new("order-flow"));
//! let event = Event::builder(context)
//!     .message(Message::new(json!({"order": 42})))
//!     .build();
//!
//! let enriched = event
//!     .to_builder()
//!     .add_variable("customer", json!("acme"))
//!     .build();
//!
//! assert_eq!(event.correlation_id(), enriched.correlation_id());
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::policy::PolicyInstance;

/// Identity of one processing run, shared by every event derived during it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    id: Uuid,
    correlation_id: String,
    flow_name: String,
    received_at: DateTime<Utc>,
}

impl EventContext {
    /// Create a context with a generated correlation id.
    pub fn new(flow_name: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            correlation_id: id.to_string(),
            flow_name: flow_name.into(),
            received_at: Utc::now(),
        }
    }

    /// Create a context carrying a correlation id supplied by the transport.
    pub fn with_correlation_id(
        flow_name: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id: correlation_id.into(),
            flow_name: flow_name.into(),
            received_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Payload plus transport attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    payload: Value,
    attributes: Value,
}

impl Message {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            attributes: Value::Null,
        }
    }

    pub fn with_attributes(payload: Value, attributes: Value) -> Self {
        Self {
            payload,
            attributes,
        }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn attributes(&self) -> &Value {
        &self.attributes
    }
}

/// Message envelope flowing through the pipeline.
///
/// Cloning is cheap: all parts are reference counted and shared until a
/// builder replaces them.
#[derive(Clone)]
pub struct Event {
    context: Arc<EventContext>,
    message: Arc<Message>,
    variables: Arc<HashMap<String, Value>>,
    policy_instances: Arc<Vec<Arc<PolicyInstance>>>,
}

impl Event {
    /// Start a fresh event for the given processing run.
    pub fn builder(context: Arc<EventContext>) -> EventBuilder {
        EventBuilder {
            context,
            message: Arc::new(Message::default()),
            variables: Arc::new(HashMap::new()),
            policy_instances: Arc::new(Vec::new()),
        }
    }

    /// Derive a new event from this one, sharing all unmodified parts.
    pub fn to_builder(&self) -> EventBuilder {
        EventBuilder {
            context: Arc::clone(&self.context),
            message: Arc::clone(&self.message),
            variables: Arc::clone(&self.variables),
            policy_instances: Arc::clone(&self.policy_instances),
        }
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn context_arc(&self) -> Arc<EventContext> {
        Arc::clone(&self.context)
    }

    pub fn correlation_id(&self) -> &str {
        self.context.correlation_id()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn message_arc(&self) -> Arc<Message> {
        Arc::clone(&self.message)
    }

    pub fn payload(&self) -> &Value {
        self.message.payload()
    }

    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Policy instances attached while this message is in flight, in
    /// attachment order.
    pub fn policy_instances(&self) -> &[Arc<PolicyInstance>] {
        &self.policy_instances
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("correlation_id", &self.context.correlation_id())
            .field("flow_name", &self.context.flow_name())
            .field("payload", self.message.payload())
            .field("variables", &self.variables.len())
            .field("policy_instances", &self.policy_instances.len())
            .finish()
    }
}

/// Copy-on-write builder for [`Event`].
#[derive(Debug)]
pub struct EventBuilder {
    context: Arc<EventContext>,
    message: Arc<Message>,
    variables: Arc<HashMap<String, Value>>,
    policy_instances: Arc<Vec<Arc<PolicyInstance>>>,
}

impl EventBuilder {
    /// Replace the message envelope.
    pub fn message(mut self, message: Message) -> Self {
        self.message = Arc::new(message);
        self
    }

    /// Share an existing message envelope without copying it.
    pub fn message_arc(mut self, message: Arc<Message>) -> Self {
        self.message = message;
        self
    }

    /// Replace the payload, keeping the current attributes.
    pub fn payload(mut self, payload: Value) -> Self {
        self.message = Arc::new(Message::with_attributes(
            payload,
            self.message.attributes().clone(),
        ));
        self
    }

    /// Set a flow variable, copying the variable set on first write.
    pub fn add_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        let mut variables = (*self.variables).clone();
        variables.insert(name.into(), value);
        self.variables = Arc::new(variables);
        self
    }

    /// Attach a policy instance; instances accumulate in attachment order.
    pub fn attach_policy_instance(mut self, instance: Arc<PolicyInstance>) -> Self {
        let mut instances = (*self.policy_instances).clone();
        instances.push(instance);
        self.policy_instances = Arc::new(instances);
        self
    }

    pub fn build(self) -> Event {
        Event {
            context: self.context,
            message: self.message,
            variables: self.variables,
            policy_instances: self.policy_instances,
        }
    }
}
