//! Publisher and subscriber seams.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::MessagingError;
use crate::message::Message;

/// A stream of deliveries awaiting acknowledgment.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Delivery, MessagingError>> + Send>>;

/// One delivered message plus its acknowledgment handle.
///
/// The broker holds the delivery's offset until [`ack`](Delivery::ack)
/// is called. A delivery dropped without acknowledgment is redelivered
/// once its subscription is re-established, so consumers only ack after
/// processing has succeeded.
pub struct Delivery {
    /// The delivered message envelope.
    pub message: Message,
    ack: Option<Box<dyn FnOnce() + Send>>,
}

impl Delivery {
    /// Wraps a message with no acknowledgment side effect.
    pub fn new(message: Message) -> Self {
        Self { message, ack: None }
    }

    /// Wraps a message with an acknowledgment callback.
    pub fn with_ack(message: Message, ack: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            message,
            ack: Some(ack),
        }
    }

    /// Marks the delivery as processed, letting the broker advance past
    /// its offset.
    pub fn ack(mut self) {
        if let Some(ack) = self.ack.take() {
            ack();
        }
    }
}

/// Durable, at-least-once message publication.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one message to a topic.
    ///
    /// Returns once the broker durably accepts the message; it does not
    /// wait for any business outcome. A returned error means the caller
    /// must decide whether to retry — retrying may enqueue duplicates,
    /// which downstream consumers are expected to tolerate.
    async fn publish(&self, topic: &str, message: Message) -> Result<(), MessagingError>;
}

/// Push-based message consumption.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Opens a delivery stream for a topic.
    ///
    /// Depending on configuration the subscription either joins a shared
    /// consumer group (messages partitioned across instances) or fans
    /// out (every instance sees every message). Each delivery must be
    /// acknowledged once processed; unacknowledged deliveries come back
    /// after a resubscribe.
    async fn subscribe(&self, topic: &str) -> Result<MessageStream, MessagingError>;
}
