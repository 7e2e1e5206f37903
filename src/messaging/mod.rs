//! # Messaging Failures
//!
//! Structured error carrying for in-flight messages.
//!
//! ## Overview
//!
//! A [`MessagingError`] always carries the partially processed [`Event`] so
//! that exception handlers and failure responses can observe whatever state
//! the message reached before failing. Handlers implement
//! [`ExceptionHandler`]; a handler either translates the failure into a
//! result event or lets a (possibly new) error escape to the caller — never
//! both.

pub mod errors;

pub use errors::{MessagingError, MessagingResult};

use crate::event::Event;
use async_trait::async_trait;

/// Handles a messaging failure for one in-flight message.
///
/// Invoked exactly once per failed message. Returning `Ok(event)` resolves
/// the failure with a recovery event; returning `Err` propagates the error to
/// the caller.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    async fn handle_exception(
        &self,
        error: MessagingError,
        event: Event,
    ) -> Result<Event, MessagingError>;
}
