//! Event bus — fire-and-forget fan-out of analysis events.
//!
//! Publishing is best-effort by contract: a completed analysis is durable
//! whether or not anyone is listening, and a publish failure never rolls an
//! analysis back.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Events published by the analysis pipeline.
///
/// The `type` tag doubles as the topic name on any event-bus boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// An analysis was durably stored.
    #[serde(rename_all = "camelCase")]
    MessageProcessed {
        message_id: String,
        user_id: String,
        summary: String,
        priority_score: u8,
        is_vip: bool,
        action_items_count: usize,
    },
    /// Hello frame sent to each WebSocket client on connect.
    EventStreamReady,
}

/// Broadcast-backed event bus.
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a new event bus.
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self { tx })
    }

    /// Subscribe to analysis events. Each WS client calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Non-blocking; having zero subscribers is not an error.
    pub fn publish(&self, event: AnalysisEvent) {
        debug!(event = ?event, "Publishing event");
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers (used by tests).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed_event() -> AnalysisEvent {
        AnalysisEvent::MessageProcessed {
            message_id: "m1".into(),
            user_id: "u1".into(),
            summary: "Alice: budget".into(),
            priority_score: 82,
            is_vip: true,
            action_items_count: 2,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(processed_event());

        match rx.recv().await.unwrap() {
            AnalysisEvent::MessageProcessed {
                message_id,
                priority_score,
                is_vip,
                action_items_count,
                ..
            } => {
                assert_eq!(message_id, "m1");
                assert_eq!(priority_score, 82);
                assert!(is_vip);
                assert_eq!(action_items_count, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::new();
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(processed_event());
    }

    #[test]
    fn event_serializes_with_topic_tag_and_camel_case_payload() {
        let json = serde_json::to_value(processed_event()).unwrap();
        assert_eq!(json["type"], "message_processed");
        assert_eq!(json["messageId"], "m1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["priorityScore"], 82);
        assert_eq!(json["isVip"], true);
        assert_eq!(json["actionItemsCount"], 2);
    }

    #[test]
    fn hello_frame_serializes_tag_only() {
        let json = serde_json::to_value(AnalysisEvent::EventStreamReady).unwrap();
        assert_eq!(json["type"], "event_stream_ready");
    }
}
