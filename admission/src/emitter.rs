//! Background event emitter.
//!
//! Fire-and-forget handoff from the admission hot path to the broker: a
//! bounded `mpsc` channel feeds one spawned sender task, so a slow or
//! failing broker never adds latency or failure modes to the admission
//! decision. A full buffer drops the event with a warning — delivery is
//! best-effort by contract, and downstream consumers deduplicate anyway.

use presence_core::{EventPublisher, PresenceEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Cloneable handle to the background sender.
///
/// Dropping every handle closes the channel; the sender task drains what is
/// buffered and stops.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<PresenceEvent>,
}

impl EventEmitter {
    /// Spawn the background sender and return a handle to it.
    ///
    /// Events are JSON-encoded and published to `topic`, keyed by record
    /// id. Publish failures are logged and swallowed.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<B>(publisher: B, topic: impl Into<String>, buffer: usize) -> Self
    where
        B: EventPublisher + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<PresenceEvent>(buffer.max(1));
        let topic = topic.into();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let key = event.key();
                let payload = match event.to_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(key, error = %e, "failed to encode presence event");
                        continue;
                    }
                };
                if let Err(e) = publisher.publish(&topic, &key, &payload).await {
                    tracing::warn!(key, error = %e, "presence event publish failed, dropping");
                }
            }
            tracing::debug!(topic, "presence event emitter stopped");
        });

        Self { tx }
    }

    /// Hand an event to the background sender without blocking.
    ///
    /// Never fails the caller: a full buffer or stopped sender drops the
    /// event with a warning.
    pub fn emit(&self, event: PresenceEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(key = %event.key(), "emitter buffer full, dropping presence event");
            }
            Err(TrySendError::Closed(event)) => {
                tracing::warn!(key = %event.key(), "emitter stopped, dropping presence event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::RecordingPublisher;
    use chrono::Utc;
    use presence_core::{PersonId, RecordId, RoomId};
    use std::time::Duration;

    fn checked_in() -> PresenceEvent {
        PresenceEvent::CheckedIn {
            record_id: RecordId::new(),
            person_id: PersonId::new(),
            room_id: RoomId::new(),
            check_in_time: Utc::now(),
        }
    }

    async fn wait_for_published(publisher: &RecordingPublisher, n: usize) {
        for _ in 0..100 {
            if publisher.published().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(
            publisher.published().len() >= n,
            "expected {n} published events, got {}",
            publisher.published().len()
        );
    }

    #[tokio::test]
    async fn events_reach_the_publisher_in_the_background() {
        let publisher = RecordingPublisher::default();
        let emitter = EventEmitter::spawn(publisher.clone(), "test-topic", 8);

        let event = checked_in();
        emitter.emit(event.clone());
        wait_for_published(&publisher, 1).await;

        let published = publisher.published();
        assert_eq!(published[0].topic, "test-topic");
        assert_eq!(published[0].key, event.key());
        assert_eq!(publisher.events()[0], event);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let publisher = RecordingPublisher::default();
        publisher.set_fail(true);
        let emitter = EventEmitter::spawn(publisher.clone(), "test-topic", 8);

        emitter.emit(checked_in());
        // Give the sender task time to attempt and fail
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(publisher.published().is_empty());

        // The emitter keeps working once the publisher recovers
        publisher.set_fail(false);
        emitter.emit(checked_in());
        wait_for_published(&publisher, 1).await;
    }
}
