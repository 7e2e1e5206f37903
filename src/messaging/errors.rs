//! Messaging error types, using thiserror for structured errors instead of
//! `Box<dyn Error>` patterns.

use crate::error::CoreError;
use crate::event::Event;
use thiserror::Error;

/// Failure of an in-flight message, carrying the partially processed event.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MessagingError {
    message: String,
    event: Event,
    failing_component: Option<String>,
}

impl MessagingError {
    pub fn new(message: impl Into<String>, event: Event) -> Self {
        Self {
            message: message.into(),
            event,
            failing_component: None,
        }
    }

    /// Name the component the failure originated in.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.failing_component = Some(component.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The event as far as it got before the failure.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }

    pub fn failing_component(&self) -> Option<&str> {
        self.failing_component.as_deref()
    }

    /// Replace the carried event, e.g. after an exception handler enriched it.
    pub fn with_event(mut self, event: Event) -> Self {
        self.event = event;
        self
    }
}

impl From<MessagingError> for CoreError {
    fn from(err: MessagingError) -> Self {
        CoreError::MessagingError(err.message)
    }
}

/// Result type alias for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;
