//! # B3 codec
//!
//! Propagates span contexts through the Zipkin B3 multi-header format:
//! one header per identity field plus the sampling headers
//! `X-B3-Sampled` and `X-B3-Flags`.

use lazy_static::lazy_static;

use crate::propagation::{Codec, Extractor, Injector, PropagationError};
use crate::span_context::{SpanContext, SpanId, TraceFlags, TraceId};

/// Header holding the trace id, zero-padded hex.
pub const B3_TRACE_ID_HEADER: &str = "X-B3-TraceId";
/// Header holding the span id, 16 hex characters.
pub const B3_SPAN_ID_HEADER: &str = "X-B3-SpanId";
/// Header holding the parent span id, only present for non-root spans.
pub const B3_PARENT_SPAN_ID_HEADER: &str = "X-B3-ParentSpanId";
/// Header carrying the sampling decision.
pub const B3_SAMPLED_HEADER: &str = "X-B3-Sampled";
/// Header carrying the debug flag, which implies sampling.
pub const B3_DEBUG_FLAG_HEADER: &str = "X-B3-Flags";

lazy_static! {
    static ref B3_FIELDS: [String; 5] = [
        B3_TRACE_ID_HEADER.to_string(),
        B3_SPAN_ID_HEADER.to_string(),
        B3_PARENT_SPAN_ID_HEADER.to_string(),
        B3_SAMPLED_HEADER.to_string(),
        B3_DEBUG_FLAG_HEADER.to_string(),
    ];
}

/// `B3Codec` implements the B3 multi-header propagation format.
///
/// Debug wins over sampled on inject: a debug context sets only
/// `X-B3-Flags: 1`, a sampled one only `X-B3-Sampled: 1`. On extract
/// the two headers accumulate into the flags independently, and any
/// value other than `1` is ignored.
///
/// Baggage and debug ids do not travel through this format.
#[derive(Clone, Debug, Default)]
pub struct B3Codec {
    use_128bit_trace_id: bool,
}

impl B3Codec {
    /// Create a B3 codec injecting 64-bit (16 hex character) trace ids.
    pub fn new() -> Self {
        B3Codec {
            use_128bit_trace_id: false,
        }
    }

    /// Create a B3 codec injecting 128-bit (32 hex character) trace
    /// ids.
    ///
    /// Extraction accepts either width regardless of this setting.
    pub fn with_128bit_trace_id() -> Self {
        B3Codec {
            use_128bit_trace_id: true,
        }
    }

    /// Header names this codec may write on inject.
    pub fn fields(&self) -> &'static [String] {
        B3_FIELDS.as_ref()
    }
}

impl Codec for B3Codec {
    type InjectCarrier = dyn Injector;
    type ExtractCarrier = dyn Extractor;

    fn inject(&self, context: &SpanContext, carrier: &mut Self::InjectCarrier) {
        if self.use_128bit_trace_id {
            carrier.set(B3_TRACE_ID_HEADER, format!("{:032x}", context.trace_id()));
        } else {
            carrier.set(B3_TRACE_ID_HEADER, format!("{:016x}", context.trace_id()));
        }
        carrier.set(B3_SPAN_ID_HEADER, format!("{:016x}", context.span_id()));
        if let Some(parent_id) = context.parent_id() {
            carrier.set(B3_PARENT_SPAN_ID_HEADER, format!("{parent_id:016x}"));
        }

        if context.is_debug() {
            carrier.set(B3_DEBUG_FLAG_HEADER, "1".to_string());
        } else if context.is_sampled() {
            carrier.set(B3_SAMPLED_HEADER, "1".to_string());
        }
    }

    fn extract(
        &self,
        carrier: &Self::ExtractCarrier,
    ) -> Result<Option<SpanContext>, PropagationError> {
        let trace_id = match carrier.get(B3_TRACE_ID_HEADER) {
            Some(header) => TraceId::from_hex(header).map_err(|_| malformed(header))?,
            None => TraceId::INVALID,
        };
        let span_id = match carrier.get(B3_SPAN_ID_HEADER) {
            Some(header) => SpanId::from_hex(header).map_err(|_| malformed(header))?,
            None => SpanId::INVALID,
        };
        let parent_id = match carrier.get(B3_PARENT_SPAN_ID_HEADER) {
            Some(header) => SpanId::from_hex(header).map_err(|_| malformed(header))?,
            None => SpanId::INVALID,
        };

        let mut flags = TraceFlags::default();
        if carrier.get(B3_SAMPLED_HEADER) == Some("1") {
            flags = flags | TraceFlags::SAMPLED;
        }
        if carrier.get(B3_DEBUG_FLAG_HEADER) == Some("1") {
            flags = flags | TraceFlags::DEBUG;
        }

        if trace_id == TraceId::INVALID || span_id == SpanId::INVALID {
            return Ok(None);
        }
        let parent_id = if parent_id == SpanId::INVALID {
            None
        } else {
            Some(parent_id)
        };
        Ok(Some(SpanContext::new(trace_id, span_id, parent_id, flags)))
    }
}

fn malformed(header: &str) -> PropagationError {
    PropagationError::ContextCorrupted(format!(
        "malformed trace context {header:?}, expected hex string"
    ))
}
