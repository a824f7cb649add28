//! Recording event publisher.

use presence_core::{EventPublisher, PresenceError, PresenceEvent, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One captured publication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedEvent {
    /// Topic the event was published to
    pub topic: String,
    /// Partition/deduplication key
    pub key: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
}

/// Publisher that records everything it is given, with a programmable
/// failure flag for exercising the log-and-continue publish path.
#[derive(Clone, Debug, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<PublishedEvent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPublisher {
    /// Everything published so far.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Published payloads decoded back into domain events.
    #[must_use]
    pub fn events(&self) -> Vec<PresenceEvent> {
        self.published()
            .iter()
            .filter_map(|p| serde_json::from_slice(&p.payload).ok())
            .collect()
    }

    /// Make every publish fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PresenceError::Publish("mock broker down".into()));
        }
        self.published
            .lock()
            .map_err(|_| PresenceError::Storage("mutex poisoned".into()))?
            .push(PublishedEvent {
                topic: topic.to_owned(),
                key: key.to_owned(),
                payload: payload.to_vec(),
            });
        Ok(())
    }
}
