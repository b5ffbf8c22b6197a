//! W3C trace-context propagation.

use rand::Rng;

const SUPPORTED_VERSION: u8 = 0;
const FLAG_SAMPLED: u8 = 0x01;

/// A distributed-trace context propagated across process boundaries.
///
/// Encoded as a `traceparent` header in the interoperable text format
/// (`{version:02x}-{trace_id:032x}-{span_id:016x}-{flags:02x}`), so a
/// downstream process reconstructs the same trace without any shared
/// in-memory state. Only the sampling bit of the flags is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    /// 128-bit trace identifier.
    pub trace_id: u128,
    /// 64-bit span identifier.
    pub span_id: u64,
    /// Whether the trace is sampled.
    pub sampled: bool,
}

impl TraceContext {
    /// Starts a fresh sampled trace with random identifiers.
    pub fn start_sampled() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            trace_id: rng.r#gen::<u128>().max(1),
            span_id: rng.r#gen::<u64>().max(1),
            sampled: true,
        }
    }

    /// Derives a child context: same trace, fresh span.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: rand::thread_rng().r#gen::<u64>().max(1),
            sampled: self.sampled,
        }
    }

    /// Encodes the context in the W3C `traceparent` text format.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{:02x}-{:032x}-{:016x}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, flags
        )
    }

    /// Parses a `traceparent` header. Returns `None` for malformed or
    /// all-zero identifiers.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split('-');
        let version = u8::from_str_radix(parts.next()?, 16).ok()?;
        if version != SUPPORTED_VERSION {
            return None;
        }
        let trace_part = parts.next()?;
        let span_part = parts.next()?;
        if trace_part.len() != 32 || span_part.len() != 16 {
            return None;
        }
        let trace_id = u128::from_str_radix(trace_part, 16).ok()?;
        let span_id = u64::from_str_radix(span_part, 16).ok()?;
        let flags = u8::from_str_radix(parts.next()?, 16).ok()?;
        if parts.next().is_some() || trace_id == 0 || span_id == 0 {
            return None;
        }
        Some(Self {
            trace_id,
            span_id,
            sampled: flags & FLAG_SAMPLED != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traceparent_format() {
        let trace = TraceContext {
            trace_id: 0x0af7_651916cd43dd_8448eb211c80319c,
            span_id: 0x00f0_67aa0ba902b7,
            sampled: true,
        };
        assert_eq!(
            trace.to_traceparent(),
            "00-0af7651916cd43dd8448eb211c80319c-00f067aa0ba902b7-01"
        );
    }

    #[test]
    fn parse_roundtrip() {
        let trace = TraceContext::start_sampled();
        let parsed = TraceContext::parse(&trace.to_traceparent()).unwrap();
        assert_eq!(parsed, trace);
    }

    #[test]
    fn unsampled_flag() {
        let trace = TraceContext {
            trace_id: 1,
            span_id: 1,
            sampled: false,
        };
        assert!(trace.to_traceparent().ends_with("-00"));
        assert!(!TraceContext::parse(&trace.to_traceparent()).unwrap().sampled);
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(TraceContext::parse("").is_none());
        assert!(TraceContext::parse("00-short-span-01").is_none());
        assert!(
            TraceContext::parse("ff-0af7651916cd43dd8448eb211c80319c-00f067aa0ba902b7-01")
                .is_none()
        );
        // All-zero trace id is invalid.
        assert!(
            TraceContext::parse("00-00000000000000000000000000000000-00f067aa0ba902b7-01")
                .is_none()
        );
    }

    #[test]
    fn child_keeps_trace_id() {
        let parent = TraceContext::start_sampled();
        let child = parent.child();
        assert_eq!(child.trace_id, parent.trace_id);
        assert_ne!(child.span_id, parent.span_id);
        assert_eq!(child.sampled, parent.sampled);
    }
}
