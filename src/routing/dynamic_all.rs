//! # Dynamic All-Routes Router
//!
//! Routes a message through a set of routes obtained dynamically, per
//! message, from a [`RouteResolver`], then aggregates all the results.

use async_trait::async_trait;
use std::sync::Arc;

use super::strategy::{MulticastRoutingStrategy, RouteResultsAggregator};
use super::{Route, RouteResolver};
use crate::event::Event;
use crate::messaging::MessagingError;

/// Processor combining a per-message route resolver with the multicast
/// strategy.
pub struct DynamicAllRouter {
    resolver: Arc<dyn RouteResolver>,
    strategy: MulticastRoutingStrategy,
}

impl DynamicAllRouter {
    pub fn new(resolver: Arc<dyn RouteResolver>) -> Self {
        Self {
            resolver,
            strategy: MulticastRoutingStrategy::new(),
        }
    }

    pub fn with_aggregator(
        resolver: Arc<dyn RouteResolver>,
        aggregator: Arc<dyn RouteResultsAggregator>,
    ) -> Self {
        Self {
            resolver,
            strategy: MulticastRoutingStrategy::with_aggregator(aggregator),
        }
    }
}

#[async_trait]
impl Route for DynamicAllRouter {
    async fn process(&self, event: Event) -> Result<Event, MessagingError> {
        // Routes are resolved on every invocation, never cached.
        let routes = self.resolver.resolve_routes(&event).await?;
        self.strategy.route(event, &routes).await
    }
}
