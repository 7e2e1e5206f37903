//! # Connector Notifications
//!
//! Fire-and-forget lifecycle notifications for message processing.
//!
//! ## Overview
//!
//! The processing phase fires a [`ConnectorNotification`] when a message is
//! received and when its success or error response goes out. Publishing goes
//! through a broadcast channel: it never blocks the phase, never propagates
//! an error back into it, and tolerates having no subscribers at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

use crate::event::Event;
use crate::policy::ComponentIdentifier;

/// Points in the processing phase at which notifications fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MessageReceived,
    MessageResponse,
    MessageErrorResponse,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageReceived => "message_received",
            Self::MessageResponse => "message_response",
            Self::MessageErrorResponse => "message_error_response",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one lifecycle point for one in-flight message.
#[derive(Debug, Clone)]
pub struct ConnectorNotification {
    pub kind: NotificationKind,
    pub source: ComponentIdentifier,
    pub flow_name: String,
    pub correlation_id: String,
    pub payload: Value,
    pub fired_at: DateTime<Utc>,
}

/// Broadcast publisher for connector notifications.
#[derive(Debug, Clone)]
pub struct NotificationPublisher {
    sender: broadcast::Sender<ConnectorNotification>,
}

impl NotificationPublisher {
    /// Create a publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fire a notification for the given event.
    ///
    /// Publishing is fire-and-forget: a missing subscriber set is not an
    /// error, and nothing here can fail into the calling phase.
    pub fn notify(&self, kind: NotificationKind, event: &Event, source: &ComponentIdentifier) {
        let notification = ConnectorNotification {
            kind,
            source: source.clone(),
            flow_name: event.context().flow_name().to_string(),
            correlation_id: event.correlation_id().to_string(),
            payload: event.payload().clone(),
            fired_at: Utc::now(),
        };
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectorNotification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventContext;
    use serde_json::json;
    use std::sync::Arc;

    fn event() -> Event {
        Event::builder(Arc::new(EventContext::new("orders")))
            .payload(json!({"id": 1}))
            .build()
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        let publisher = NotificationPublisher::default();
        publisher.notify(
            NotificationKind::MessageReceived,
            &event(),
            &ComponentIdentifier::new("httpn", "listener"),
        );
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_notification() {
        let publisher = NotificationPublisher::new(8);
        let mut receiver = publisher.subscribe();

        let event = event();
        publisher.notify(
            NotificationKind::MessageResponse,
            &event,
            &ComponentIdentifier::new("httpn", "listener"),
        );

        let notification = receiver.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::MessageResponse);
        assert_eq!(notification.flow_name, "orders");
        assert_eq!(notification.correlation_id, event.correlation_id());
        assert_eq!(notification.payload, json!({"id": 1}));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            NotificationKind::MessageErrorResponse.to_string(),
            "message_error_response"
        );
    }
}
