//! # Routing
//!
//! Fan-out routing of one event across dynamically resolved routes.
//!
//! ## Overview
//!
//! A [`Route`] is any processor an event can be handed to. A
//! [`RouteResolver`] computes the route set per invocation — results are
//! never cached, so resolvers may pick routes from event content. The
//! [`MulticastRoutingStrategy`] invokes every route with an independent copy
//! of the inbound message and aggregates the results deterministically in
//! original route order, whatever order the routes complete in.
//!
//! ## Failure policy
//!
//! First-exception-wins: the first failing route (in original route order)
//! fails the whole routing operation.

pub mod dynamic_all;
pub mod strategy;

pub use dynamic_all::DynamicAllRouter;
pub use strategy::{CollectListAggregator, MulticastRoutingStrategy, RouteResultsAggregator};

use async_trait::async_trait;
use std::sync::Arc;

use crate::event::Event;
use crate::messaging::MessagingError;

/// A message-processing endpoint reachable from a routing strategy.
#[async_trait]
pub trait Route: Send + Sync {
    async fn process(&self, event: Event) -> Result<Event, MessagingError>;
}

/// Computes the route set for one invocation.
#[async_trait]
pub trait RouteResolver: Send + Sync {
    /// Resolve the routes for this event. Called on every invocation; the
    /// result must not be cached by callers.
    async fn resolve_routes(&self, event: &Event)
        -> Result<Vec<Arc<dyn Route>>, MessagingError>;
}
