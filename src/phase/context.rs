//! # Message Process Context
//!
//! Per-message collaborators and the bounded worker pool the asynchronous
//! phase unit runs on.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::config::ThreadingProfileConfig;
use crate::error::CoreError;
use crate::event::Event;
use crate::execution::TransactionConfig;
use crate::messaging::{ExceptionHandler, MessagingError};
use crate::phase::notifier::ResponseCompletion;
use crate::policy::ComponentIdentifier;

/// One phase unit of work, submitted to a scheduler as a whole.
pub type PhaseWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Failure to hand a unit of work to the worker pool.
///
/// Scheduling failures are reported directly as phase failures and are not
/// retried; the exception handler never ran for them.
#[derive(Debug, Clone, Error)]
pub enum SchedulingError {
    #[error("worker pool '{pool}' rejected work: {reason}")]
    Rejected { pool: String, reason: String },
    #[error("worker pool '{pool}' is at capacity ({limit} units in flight)")]
    CapacityExhausted { pool: String, limit: usize },
}

impl From<SchedulingError> for CoreError {
    fn from(err: SchedulingError) -> Self {
        CoreError::SchedulingError(err.to_string())
    }
}

/// A reserved slot on a worker pool.
///
/// Reservation is separate from submission so that scheduling failures are
/// observable before the unit of work (and the completion token inside it)
/// is consumed. Submission itself cannot fail.
pub trait ScheduledWorkPermit: Send {
    fn submit(self: Box<Self>, work: PhaseWork);
}

/// Bounded worker pool executing asynchronous phase units.
pub trait WorkScheduler: Send + Sync {
    /// Reserve a slot for one unit of work.
    fn reserve(&self) -> Result<Box<dyn ScheduledWorkPermit>, SchedulingError>;
}

/// Worker pool backed by the tokio runtime, bounded by a threading profile.
pub struct TokioWorkScheduler {
    name: String,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl TokioWorkScheduler {
    pub fn new(name: impl Into<String>, profile: &ThreadingProfileConfig) -> Self {
        let limit = profile.max_concurrent_units.max(1);
        Self {
            name: name.into(),
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units currently schedulable without hitting the bound.
    pub fn available_capacity(&self) -> usize {
        self.permits.available_permits()
    }
}

impl WorkScheduler for TokioWorkScheduler {
    fn reserve(&self) -> Result<Box<dyn ScheduledWorkPermit>, SchedulingError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|err| {
            SchedulingError::Rejected {
                pool: self.name.clone(),
                reason: err.to_string(),
            }
        })?;
        let permit = Arc::clone(&self.permits).try_acquire_owned().map_err(|_| {
            SchedulingError::CapacityExhausted {
                pool: self.name.clone(),
                limit: self.limit,
            }
        })?;
        Ok(Box::new(TokioWorkPermit { handle, permit }))
    }
}

struct TokioWorkPermit {
    handle: tokio::runtime::Handle,
    permit: OwnedSemaphorePermit,
}

impl ScheduledWorkPermit for TokioWorkPermit {
    fn submit(self: Box<Self>, work: PhaseWork) {
        let permit = self.permit;
        self.handle.spawn(async move {
            work.await;
            drop(permit);
        });
    }
}

/// The external message source the phase serves.
///
/// Supplies the source identity and worker pool and receives the success or
/// failure response together with an at-most-once completion token.
#[async_trait]
pub trait MessageSource: Send + Sync {
    fn component_identifier(&self) -> ComponentIdentifier;

    fn supports_asynchronous_processing(&self) -> bool;

    fn work_scheduler(&self) -> Arc<dyn WorkScheduler>;

    async fn send_response_to_client(&self, event: Event, completion: ResponseCompletion);

    async fn send_failure_response_to_client(
        &self,
        error: MessagingError,
        completion: ResponseCompletion,
    );
}

/// Everything the phase needs to process one message from one source.
#[derive(Clone)]
pub struct MessageProcessContext {
    source: Arc<dyn MessageSource>,
    flow_name: String,
    transaction_config: TransactionConfig,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl MessageProcessContext {
    pub fn new(
        source: Arc<dyn MessageSource>,
        flow_name: impl Into<String>,
        transaction_config: TransactionConfig,
        exception_handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        let flow_name = flow_name.into();
        debug!(flow = %flow_name, "Created message process context");
        Self {
            source,
            flow_name,
            transaction_config,
            exception_handler,
        }
    }

    pub fn source(&self) -> &Arc<dyn MessageSource> {
        &self.source
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn transaction_config(&self) -> &TransactionConfig {
        &self.transaction_config
    }

    pub fn exception_handler(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exception_handler
    }
}

impl fmt::Debug for MessageProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageProcessContext")
            .field("flow_name", &self.flow_name)
            .field("source", &self.source.component_identifier().to_string())
            .field("transaction_config", &self.transaction_config)
            .finish()
    }
}
