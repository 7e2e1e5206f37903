//! # Phase Completion Tokens
//!
//! One-shot completion signalling for a processing attempt.
//!
//! Both tokens here consume `self` on signal, so "exactly once" is enforced
//! by the type system rather than by convention: a second signal on the same
//! token does not compile.

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::CoreError;
use crate::messaging::{ExceptionHandler, MessagingError};
use crate::phase::PhaseState;

/// Outcome of one processing attempt.
#[derive(Debug)]
pub enum PhaseResult {
    Success,
    Failure(CoreError),
}

impl PhaseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// One-shot completion token for one processing attempt.
///
/// Exactly one of [`success`](Self::success) or
/// [`failure`](Self::failure) is signalled per attempt.
#[derive(Debug)]
pub struct PhaseResultNotifier {
    sender: oneshot::Sender<PhaseResult>,
}

impl PhaseResultNotifier {
    /// Create a notifier together with the handle that observes its signal.
    pub fn channel() -> (Self, PhaseResultHandle) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, PhaseResultHandle { receiver })
    }

    pub fn success(self) {
        debug!(state = %PhaseState::Completed, "Phase finished");
        let _ = self.sender.send(PhaseResult::Success);
    }

    pub fn failure(self, error: CoreError) {
        debug!(state = %PhaseState::Failed, error = %error, "Phase finished");
        let _ = self.sender.send(PhaseResult::Failure(error));
    }
}

/// Awaits the phase outcome signalled by the paired notifier.
#[derive(Debug)]
pub struct PhaseResultHandle {
    receiver: oneshot::Receiver<PhaseResult>,
}

impl PhaseResultHandle {
    /// Wait for the phase to finish.
    ///
    /// A notifier dropped without signalling (a worker that died mid-unit)
    /// surfaces as a failure rather than hanging the caller.
    pub async fn wait(self) -> PhaseResult {
        self.receiver.await.unwrap_or_else(|_| {
            PhaseResult::Failure(CoreError::MessagingError(
                "phase dropped without signalling a result".to_string(),
            ))
        })
    }
}

/// How a failed response delivery is resolved.
pub(crate) enum SendFailureDisposition {
    /// Success-response path: the failure runs through the exception handler
    /// once; recovery completes the phase, a handler error fails it.
    RouteThroughHandler(Arc<dyn ExceptionHandler>),
    /// Failure-response path: the handler already had its chance, so a
    /// delivery failure fails the phase directly.
    PhaseFailure,
}

/// At-most-once completion token for one response delivery.
///
/// Handed to the message source alongside the outgoing event; the source
/// reports delivery through exactly one of the two methods, each of which
/// translates into exactly one notifier signal.
pub struct ResponseCompletion {
    notifier: PhaseResultNotifier,
    on_send_failure: SendFailureDisposition,
}

impl ResponseCompletion {
    pub(crate) fn for_response(
        notifier: PhaseResultNotifier,
        exception_handler: Arc<dyn ExceptionHandler>,
    ) -> Self {
        Self {
            notifier,
            on_send_failure: SendFailureDisposition::RouteThroughHandler(exception_handler),
        }
    }

    pub(crate) fn for_failure_response(notifier: PhaseResultNotifier) -> Self {
        Self {
            notifier,
            on_send_failure: SendFailureDisposition::PhaseFailure,
        }
    }

    /// The response went out to the client.
    pub fn sent(self) {
        self.notifier.success();
    }

    /// Delivering the response failed.
    pub async fn sent_with_failure(self, error: MessagingError) {
        match self.on_send_failure {
            SendFailureDisposition::PhaseFailure => self.notifier.failure(error.into()),
            SendFailureDisposition::RouteThroughHandler(handler) => {
                let event = error.event().clone();
                match handler.handle_exception(error, event).await {
                    Ok(_) => self.notifier.success(),
                    Err(err) => self.notifier.failure(err.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventContext};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        invocations: AtomicUsize,
        recover: bool,
    }

    #[async_trait]
    impl ExceptionHandler for CountingHandler {
        async fn handle_exception(
            &self,
            error: MessagingError,
            event: Event,
        ) -> Result<Event, MessagingError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if self.recover {
                Ok(event)
            } else {
                Err(error)
            }
        }
    }

    fn event() -> Event {
        Event::builder(Arc::new(EventContext::new("completion-flow"))).build()
    }

    #[tokio::test]
    async fn test_success_signal() {
        let (notifier, handle) = PhaseResultNotifier::channel();
        notifier.success();
        assert!(handle.wait().await.is_success());
    }

    #[tokio::test]
    async fn test_dropped_notifier_surfaces_as_failure() {
        let (notifier, handle) = PhaseResultNotifier::channel();
        drop(notifier);
        match handle.wait().await {
            PhaseResult::Failure(CoreError::MessagingError(msg)) => {
                assert!(msg.contains("without signalling"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_response_completion_fails_phase_on_send_failure() {
        let (notifier, handle) = PhaseResultNotifier::channel();
        let completion = ResponseCompletion::for_failure_response(notifier);
        completion
            .sent_with_failure(MessagingError::new("socket closed", event()))
            .await;
        match handle.wait().await {
            PhaseResult::Failure(CoreError::MessagingError(msg)) => {
                assert_eq!(msg, "socket closed");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_response_completion_routes_send_failure_through_handler() {
        let handler = Arc::new(CountingHandler {
            invocations: AtomicUsize::new(0),
            recover: true,
        });
        let (notifier, handle) = PhaseResultNotifier::channel();
        let completion = ResponseCompletion::for_response(notifier, handler.clone());
        completion
            .sent_with_failure(MessagingError::new("flush failed", event()))
            .await;

        assert!(handle.wait().await.is_success());
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
    }
}
