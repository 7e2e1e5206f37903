//! # Execution Template
//!
//! Wraps one unit of flow work with transaction demarcation and
//! exception-handler routing.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::transaction::TransactionConfig;
use crate::event::Event;
use crate::messaging::{ExceptionHandler, MessagingError};

/// Single entry point for "run under transaction, route errors through the
/// handler".
///
/// Guarantees:
/// - a transaction opened here is committed exactly once on normal return
///   and rolled back exactly once on failure;
/// - the exception handler runs exactly once per failed operation, and its
///   outcome decides between recovery (`Ok(event)`) and propagation (`Err`);
/// - no failure is swallowed silently: every error either becomes a result
///   event through the handler or escapes to the caller, never both.
pub struct ExecutionTemplate {
    transaction_config: TransactionConfig,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl ExecutionTemplate {
    pub fn new(
        transaction_config: TransactionConfig,
        exception_handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        Self {
            transaction_config,
            exception_handler,
        }
    }

    /// Execute `operation` on the given event under this template's
    /// transaction and error semantics.
    pub async fn execute<F, Fut>(&self, event: Event, operation: F) -> Result<Event, MessagingError>
    where
        F: FnOnce(Event) -> Fut + Send,
        Fut: Future<Output = Result<Event, MessagingError>> + Send,
    {
        let transaction = match self.transaction_config.begin_if_required() {
            Ok(transaction) => transaction,
            Err(err) => {
                return self
                    .route_to_handler(MessagingError::new(err.to_string(), event))
                    .await;
            }
        };

        match operation(event).await {
            Ok(response) => {
                if let Some(transaction) = transaction {
                    if let Err(err) = transaction.commit() {
                        return self
                            .route_to_handler(MessagingError::new(err.to_string(), response))
                            .await;
                    }
                    debug!("Transaction committed");
                }
                Ok(response)
            }
            Err(error) => {
                if let Some(transaction) = transaction {
                    if let Err(rollback_err) = transaction.rollback() {
                        // The original failure prevails over the rollback one.
                        warn!(error = %rollback_err, "Transaction rollback failed");
                    } else {
                        debug!("Transaction rolled back");
                    }
                }
                self.route_to_handler(error).await
            }
        }
    }

    async fn route_to_handler(&self, error: MessagingError) -> Result<Event, MessagingError> {
        let event = error.event().clone();
        debug!(
            correlation_id = event.correlation_id(),
            error = error.message(),
            "Routing failure through exception handler"
        );
        self.exception_handler.handle_exception(error, event).await
    }
}
