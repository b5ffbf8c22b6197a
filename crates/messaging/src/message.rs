//! The message envelope carried on every topic.

use std::collections::HashMap;

use common::CorrelationId;
use uuid::Uuid;

use crate::trace::TraceContext;

/// Metadata key holding the correlation identifier.
pub const CORRELATION_ID_KEY: &str = "correlation_id";

/// Metadata key holding the W3C trace context.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// A durable message: unique id, opaque payload, string metadata.
///
/// Metadata travels outside the payload so brokers and middleware can
/// read it without deserializing the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Fresh identifier minted per message.
    pub id: Uuid,
    /// Serialized payload.
    pub payload: Vec<u8>,
    /// String metadata headers.
    pub metadata: HashMap<String, String>,
}

impl Message {
    /// Creates a message with a fresh id and empty metadata.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Attaches a correlation identifier to the metadata.
    pub fn set_correlation_id(&mut self, correlation_id: CorrelationId) {
        self.metadata
            .insert(CORRELATION_ID_KEY.to_string(), correlation_id.to_string());
    }

    /// Reads the correlation identifier, if present and well-formed.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        self.metadata
            .get(CORRELATION_ID_KEY)
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(CorrelationId::from_uuid)
    }

    /// Encodes a trace context into the metadata.
    pub fn set_trace_context(&mut self, trace: &TraceContext) {
        self.metadata
            .insert(TRACEPARENT_KEY.to_string(), trace.to_traceparent());
    }

    /// Decodes the trace context from the metadata, if present.
    pub fn trace_context(&self) -> Option<TraceContext> {
        self.metadata
            .get(TRACEPARENT_KEY)
            .and_then(|v| TraceContext::parse(v))
    }
}
