#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Flowgate Core
//!
//! High-performance Rust core for integration message processing.
//!
//! ## Overview
//!
//! Flowgate Core implements the execution heart of an integration runtime:
//! the ordered, asynchronous, transactional routing of an inbound message
//! through notification, policy application, flow execution, and response
//! delivery — together with the layered artifact-isolation tree used to
//! sandbox plugin code inside a shared container.
//!
//! Connectors, configuration DSLs, and dependency resolution live outside
//! this crate; the core consumes a route to invoke, a policy set to apply,
//! and an isolation tree to resolve through, and produces a response event
//! or a structured failure.
//!
//! ## Module Organization
//!
//! - [`event`] - Message envelope with copy-on-write derivation
//! - [`phase`] - The flow processing phase state machine and worker pools
//! - [`policy`] - Source policies and the policy registry
//! - [`routing`] - Multicast routing with deterministic aggregation
//! - [`execution`] - Transactional, exception-handled execution template
//! - [`notification`] - Fire-and-forget connector notifications
//! - [`isolation`] - Artifact class-visibility tree and descriptor loading
//! - [`registry`] - Bootstrap-time component registration
//! - [`messaging`] - Structured messaging failures
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgate_core::event::{Event, EventContext, Message};
//! use flowgate_core::policy::PolicyRegistry;
//! use flowgate_core::notification::NotificationPublisher;
//! use flowgate_core::phase::FlowProcessingPhase;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let policies = Arc::new(PolicyRegistry::new());
//! let notifications = NotificationPublisher::default();
//! let phase = FlowProcessingPhase::new(Arc::clone(&policies), notifications.clone());
//!
//! let event = Event::builder(Arc::new(EventContext::new("orders-flow")))
//!     .message(Message::new(json!({"order": 42})))
//!     .build();
//! assert_eq!(event.context().flow_name(), "orders-flow");
//! ```
//!
//! ## Concurrency Model
//!
//! Phase transitions are strictly sequential per message; different messages
//! process concurrently, each with independent event and policy-instance
//! state. Isolation trees are built at deploy time and read-only afterwards,
//! safe for concurrent class resolution.

pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod isolation;
pub mod logging;
pub mod messaging;
pub mod notification;
pub mod phase;
pub mod policy;
pub mod registry;
pub mod routing;

pub use config::{ConfigManager, ConfigurationError, CoreConfig, ThreadingProfileConfig};
pub use error::{CoreError, InitialisationError, Result};
pub use event::{Event, EventBuilder, EventContext, Message};
pub use execution::{ExecutionTemplate, TransactionAction, TransactionConfig};
pub use messaging::{ExceptionHandler, MessagingError};
pub use notification::{ConnectorNotification, NotificationKind, NotificationPublisher};
pub use phase::{
    FlowProcessingPhase, FlowProcessingTemplate, MessagePhase, MessageProcessContext,
    MessageSource, PhaseRank, PhaseResult, PhaseResultHandle, PhaseResultNotifier, PhaseState,
    ResponseCompletion, SchedulingError, TokioWorkScheduler, WorkScheduler,
};
pub use policy::{
    ComponentIdentifier, PolicyInstance, PolicyRegistry, SourcePolicy, SourcePolicyDecision,
};
pub use routing::{
    DynamicAllRouter, MulticastRoutingStrategy, Route, RouteResolver, RouteResultsAggregator,
};
