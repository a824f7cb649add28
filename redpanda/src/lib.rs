//! Redpanda event publisher for the presence admission pipeline.
//!
//! Implements the [`EventPublisher`] trait from `presence-core` over
//! rdkafka, publishing presence-transition events to a Kafka-compatible
//! broker.
//!
//! # Why Redpanda?
//!
//! - **Kafka-compatible**: Standard Kafka protocol; works with Redpanda,
//!   Apache Kafka, AWS MSK, Azure Event Hubs, etc.
//! - **Simpler operations**: Easier to deploy and operate than Kafka
//! - **Self-hostable**: Docker, Kubernetes, bare metal
//!
//! # Delivery Semantics
//!
//! Publication is fire-and-forget from the admission pipeline's
//! perspective: at-least-once at most, no exactly-once. Events are keyed by
//! record id so partition ordering holds per record, and downstream
//! consumers perform their own deduplication.
//!
//! # Example
//!
//! ```no_run
//! use presence_redpanda::RedpandaPublisher;
//! use presence_core::{EventPublisher, PresenceEvent, DEFAULT_PRESENCE_TOPIC};
//!
//! # async fn example(event: PresenceEvent) -> Result<(), Box<dyn std::error::Error>> {
//! let publisher = RedpandaPublisher::builder()
//!     .brokers("localhost:9092")
//!     .producer_acks("all")
//!     .compression("lz4")
//!     .build()?;
//!
//! let payload = event.to_payload()?;
//! publisher.publish(DEFAULT_PRESENCE_TOPIC, &event.key(), &payload).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use presence_core::{EventPublisher, PresenceError, Result};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;

/// Redpanda/Kafka implementation of [`EventPublisher`].
///
/// # Configuration
///
/// - **Broker addresses**: bootstrap servers (required)
/// - **Producer settings**: acks, compression, send timeout
///
/// # Thread Safety
///
/// This type is `Clone`; clones share the same producer.
#[derive(Clone)]
pub struct RedpandaPublisher {
    /// Kafka producer for publishing events
    producer: FutureProducer,
    /// Producer send timeout
    timeout: Duration,
}

impl RedpandaPublisher {
    /// Create a publisher with default configuration.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated broker addresses (e.g., "localhost:9092")
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::Publish`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the publisher.
    #[must_use]
    pub fn builder() -> RedpandaPublisherBuilder {
        RedpandaPublisherBuilder::default()
    }
}

impl EventPublisher for RedpandaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _message)| PresenceError::Publish(e.to_string()))?;

        tracing::debug!(topic, key, partition, offset, "published presence event");
        Ok(())
    }
}

/// Builder for configuring a [`RedpandaPublisher`].
#[derive(Default)]
pub struct RedpandaPublisherBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaPublisherBuilder {
    /// Set the broker addresses.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated broker addresses (e.g., "localhost:9092")
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode.
    ///
    /// # Parameters
    ///
    /// - `acks`: "0" (no acks), "1" (leader ack), "all" (all replicas ack)
    ///
    /// Default: "1"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec.
    ///
    /// # Parameters
    ///
    /// - `compression`: "none", "gzip", "snappy", "lz4", "zstd"
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`RedpandaPublisher`].
    ///
    /// # Errors
    ///
    /// Returns [`PresenceError::Publish`] if brokers are not set or the
    /// producer cannot be created.
    pub fn build(self) -> Result<RedpandaPublisher> {
        let brokers = self
            .brokers
            .ok_or_else(|| PresenceError::Publish("brokers not configured".to_string()))?;

        let mut producer_config = ClientConfig::new();
        producer_config
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.producer_acks.as_deref().unwrap_or("1"))
            .set(
                "compression.type",
                self.compression.as_deref().unwrap_or("none"),
            );

        let producer: FutureProducer = producer_config
            .create()
            .map_err(|e| PresenceError::Publish(format!("failed to create producer: {e}")))?;

        tracing::info!(brokers = %brokers, "Redpanda publisher initialized");

        Ok(RedpandaPublisher {
            producer,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_brokers_fails() {
        let result = RedpandaPublisher::builder().build();
        assert!(matches!(result, Err(PresenceError::Publish(_))));
    }

    #[test]
    fn build_with_brokers_configures_a_producer() {
        // Producer creation is lazy in librdkafka; no broker needs to be
        // reachable for configuration to succeed.
        let result = RedpandaPublisher::builder()
            .brokers("localhost:9092")
            .producer_acks("all")
            .compression("lz4")
            .timeout(Duration::from_secs(2))
            .build();
        assert!(result.is_ok());
    }
}
