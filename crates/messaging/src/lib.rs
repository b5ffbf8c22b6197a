//! Event-stream plumbing for the purchase gateway.
//!
//! Commands and results travel as [`Message`] envelopes: an opaque
//! payload plus string metadata carrying the correlation identifier and
//! the W3C trace context, so intermediate infrastructure can group and
//! trace related messages without deserializing payloads.
//!
//! Two bus implementations satisfy the [`Publisher`]/[`Subscriber`]
//! traits: [`KafkaEventBus`] for production (at-least-once, consumer
//! groups or fan-out) and [`InMemoryEventBus`] for tests and local
//! wiring.

pub mod bus;
pub mod error;
pub mod kafka;
pub mod memory;
pub mod message;
pub mod trace;

pub use bus::{Delivery, MessageStream, Publisher, Subscriber};
pub use error::MessagingError;
pub use kafka::KafkaEventBus;
pub use memory::InMemoryEventBus;
pub use message::Message;
pub use trace::TraceContext;

/// Topic carrying purchase-creation commands.
pub const PURCHASE_TOPIC: &str = "purchase";

/// Topic carrying asynchronous purchase results.
pub const PURCHASE_RESULT_TOPIC: &str = "purchase.result";
