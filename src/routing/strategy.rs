//! # Multicast Routing Strategy
//!
//! Concurrent fan-out with deterministic, order-preserving aggregation.

use futures::future;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::Route;
use crate::event::Event;
use crate::messaging::MessagingError;

/// Merges the per-route result events into a single response event.
pub trait RouteResultsAggregator: Send + Sync {
    /// `results` is ordered by original route position, not completion order.
    fn aggregate(&self, original: &Event, results: Vec<Event>) -> Result<Event, MessagingError>;
}

/// Default aggregator: a single result passes through unchanged; multiple
/// results collapse into a list-valued payload preserving route order.
#[derive(Debug, Default)]
pub struct CollectListAggregator;

impl RouteResultsAggregator for CollectListAggregator {
    fn aggregate(&self, original: &Event, mut results: Vec<Event>) -> Result<Event, MessagingError> {
        match results.len() {
            0 => Ok(original.clone()),
            1 => Ok(results.remove(0)),
            _ => {
                let payloads: Vec<Value> =
                    results.iter().map(|event| event.payload().clone()).collect();
                Ok(original.to_builder().payload(Value::Array(payloads)).build())
            }
        }
    }
}

/// Routes one event through a set of routes and aggregates the results.
pub struct MulticastRoutingStrategy {
    aggregator: Arc<dyn RouteResultsAggregator>,
}

impl MulticastRoutingStrategy {
    pub fn new() -> Self {
        Self {
            aggregator: Arc::new(CollectListAggregator),
        }
    }

    pub fn with_aggregator(aggregator: Arc<dyn RouteResultsAggregator>) -> Self {
        Self { aggregator }
    }

    /// Invoke every route with an independent copy of the inbound message.
    ///
    /// An empty route set is a no-op and returns the input event unchanged.
    /// Routes run concurrently; results are aggregated by original route
    /// order and the first failing route (in that order) fails the call.
    pub async fn route(
        &self,
        event: Event,
        routes: &[Arc<dyn Route>],
    ) -> Result<Event, MessagingError> {
        if routes.is_empty() {
            return Ok(event);
        }

        debug!(
            correlation_id = event.correlation_id(),
            routes = routes.len(),
            "Routing event through multicast strategy"
        );

        let invocations = routes.iter().map(|route| {
            // Each route gets a fresh envelope around the shared message.
            let copy = Event::builder(event.context_arc())
                .message_arc(event.message_arc())
                .build();
            let route = Arc::clone(route);
            async move { route.process(copy).await }
        });

        let outcomes = future::join_all(invocations).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            results.push(outcome?);
        }

        self.aggregator.aggregate(&event, results)
    }
}

impl Default for MulticastRoutingStrategy {
    fn default() -> Self {
        Self::new()
    }
}
