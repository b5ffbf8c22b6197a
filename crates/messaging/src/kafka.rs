//! Kafka-backed event bus.
//!
//! At-least-once delivery with manual offset commits: an offset is
//! committed only when the subscriber acknowledges the delivery, so a
//! crash or a processing failure before the ack redelivers the message
//! to the next consumer in the group. Subscribers must treat deliveries
//! as overwritable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{Header, Headers, Message as KafkaMessage, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::bus::{Delivery, MessageStream, Publisher, Subscriber};
use crate::error::MessagingError;
use crate::message::Message;

/// Kafka event bus: one shared producer, one consumer per subscription.
///
/// With an explicit consumer group, instances of the gateway share the
/// workload and each sees a subset of partitions. Without one, every
/// subscription gets a unique group id, so every instance observes the
/// full stream (fan-out).
pub struct KafkaEventBus {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
    consumer_group: Option<String>,
    buffer_size: usize,
    auto_offset_reset: String,
}

impl KafkaEventBus {
    /// Connects to the given brokers with default settings.
    pub fn new(brokers: &str) -> Result<Self, MessagingError> {
        Self::builder().brokers(brokers).build()
    }

    /// Returns a builder for custom configuration.
    pub fn builder() -> KafkaEventBusBuilder {
        KafkaEventBusBuilder::default()
    }
}

/// Builder for [`KafkaEventBus`].
#[derive(Default)]
pub struct KafkaEventBusBuilder {
    brokers: Option<String>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
    timeout: Option<Duration>,
}

impl KafkaEventBusBuilder {
    /// Sets the comma-separated broker address list.
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Joins a shared consumer group. Leave unset for fan-out mode.
    pub fn consumer_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        if !group.is_empty() {
            self.consumer_group = Some(group);
        }
        self
    }

    /// Sets the in-flight buffer between the consumer and subscribers.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    /// Sets where a new consumer group starts reading.
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Sets the producer send timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the bus, creating the shared producer.
    pub fn build(self) -> Result<KafkaEventBus, MessagingError> {
        let brokers = self
            .brokers
            .ok_or_else(|| MessagingError::Connection("brokers not configured".to_string()))?;

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| MessagingError::Connection(format!("failed to create producer: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            consumer_group = self.consumer_group.as_deref().unwrap_or("<fan-out>"),
            "kafka event bus connected"
        );

        Ok(KafkaEventBus {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
            consumer_group: self.consumer_group,
            buffer_size: self.buffer_size.unwrap_or(1000),
            auto_offset_reset: self.auto_offset_reset.unwrap_or_else(|| "latest".to_string()),
        })
    }
}

#[async_trait]
impl Publisher for KafkaEventBus {
    async fn publish(&self, topic: &str, message: Message) -> Result<(), MessagingError> {
        let mut headers = OwnedHeaders::new_with_capacity(message.metadata.len());
        for (key, value) in &message.metadata {
            headers = headers.insert(Header {
                key,
                value: Some(value.as_str()),
            });
        }

        let key = message.id.to_string();
        let record = FutureRecord::to(topic)
            .payload(&message.payload)
            .key(&key)
            .headers(headers);

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => {
                tracing::debug!(topic, partition, offset, message_id = %message.id, "message published");
                metrics::counter!("messages_published_total", "topic" => topic.to_string())
                    .increment(1);
                Ok(())
            }
            Err((err, _)) => {
                tracing::error!(topic, error = %err, "publish failed");
                Err(MessagingError::PublishFailed {
                    topic: topic.to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl Subscriber for KafkaEventBus {
    async fn subscribe(&self, topic: &str) -> Result<MessageStream, MessagingError> {
        // Fan-out mode uses a unique group so this instance sees the
        // whole stream.
        let group_id = self
            .consumer_group
            .clone()
            .unwrap_or_else(|| format!("purchase-gateway-{}", Uuid::new_v4().simple()));

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| MessagingError::SubscribeFailed {
                topic: topic.to_string(),
                reason: format!("failed to create consumer: {e}"),
            })?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| MessagingError::SubscribeFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(topic, consumer_group = %group_id, "subscribed");

        let (tx, rx) = tokio::sync::mpsc::channel(self.buffer_size);
        let topic_name = topic.to_string();
        let consumer = Arc::new(consumer);

        tokio::spawn(async move {
            loop {
                match consumer.recv().await {
                    Ok(borrowed) => {
                        let message = to_message(&borrowed);
                        // The offset stays uncommitted until the
                        // subscriber acks, so a processing failure
                        // redelivers on the next subscription.
                        let delivery =
                            Delivery::with_ack(message, commit_on_ack(&consumer, &borrowed));
                        if tx.send(Ok(delivery)).await.is_err() {
                            tracing::debug!(topic = %topic_name, "subscriber dropped, stopping consumer");
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!(topic = %topic_name, error = %err, "consumer receive error");
                        let closed = MessagingError::Closed {
                            topic: topic_name.clone(),
                        };
                        if tx.send(Err(closed)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Builds an ack callback committing the offset just past `borrowed`.
fn commit_on_ack(
    consumer: &Arc<StreamConsumer>,
    borrowed: &rdkafka::message::BorrowedMessage<'_>,
) -> Box<dyn FnOnce() + Send> {
    let consumer = Arc::clone(consumer);
    let topic = borrowed.topic().to_string();
    let partition = borrowed.partition();
    let offset = borrowed.offset();

    Box::new(move || {
        let mut positions = TopicPartitionList::new();
        if let Err(error) =
            positions.add_partition_offset(&topic, partition, Offset::Offset(offset + 1))
        {
            tracing::warn!(topic = %topic, partition, offset, error = %error, "offset commit failed");
            return;
        }
        if let Err(error) = consumer.commit(&positions, CommitMode::Async) {
            tracing::warn!(topic = %topic, partition, offset, error = %error, "offset commit failed");
        }
    })
}

fn to_message(borrowed: &rdkafka::message::BorrowedMessage<'_>) -> Message {
    let id = borrowed
        .key()
        .and_then(|k| std::str::from_utf8(k).ok())
        .and_then(|k| Uuid::parse_str(k).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut message = Message {
        id,
        payload: borrowed.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        metadata: std::collections::HashMap::new(),
    };

    if let Some(headers) = borrowed.headers() {
        for header in headers.iter() {
            if let Some(value) = header.value {
                message.metadata.insert(
                    header.key.to_string(),
                    String::from_utf8_lossy(value).into_owned(),
                );
            }
        }
    }
    message
}
