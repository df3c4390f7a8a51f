//! # Zipkin span codec
//!
//! Propagates the four span identity numbers through the in-memory
//! carriers used by Zipkin-style RPC frameworks: either a map of named
//! numeric fields, or a span-like object exposing the same fields as
//! typed accessors.
//!
//! This format carries no baggage.

use std::collections::HashMap;

use crate::propagation::{Codec, PropagationError};
use crate::span_context::{SpanContext, SpanId, TraceFlags, TraceId};

/// Format name under which this codec is conventionally registered.
pub const ZIPKIN_SPAN_FORMAT: &str = "zipkin-span-format";

/// Carrier field holding the trace id.
pub const TRACE_ID_FIELD: &str = "trace_id";
/// Carrier field holding the span id.
pub const SPAN_ID_FIELD: &str = "span_id";
/// Carrier field holding the parent span id.
pub const PARENT_ID_FIELD: &str = "parent_id";
/// Carrier field holding the trace flags.
pub const FLAGS_FIELD: &str = "traceflags";

/// Read access to the span identity fields of a Zipkin-style span
/// carrier.
///
/// `None` means the carrier has no such field at all, which
/// [`ZipkinCodec::extract_from_fields`] reports as an invalid carrier.
/// A root span reports `Some(0)` for the parent id rather than `None`.
pub trait SpanFieldCarrier {
    /// Trace id; `Some(0)` when unset.
    fn trace_id(&self) -> Option<u128>;
    /// Span id; `Some(0)` when unset.
    fn span_id(&self) -> Option<u64>;
    /// Parent span id; `Some(0)` for a root span.
    fn parent_id(&self) -> Option<u64>;
    /// Trace flags byte.
    fn trace_flags(&self) -> Option<u8>;
}

/// `ZipkinCodec` propagates span identity as named numeric fields.
///
/// Map extraction is lenient: missing fields are treated as zero and an
/// absent or zero trace id yields `Ok(None)`. Values too wide for their
/// field are corruption.
#[derive(Clone, Debug, Default)]
pub struct ZipkinCodec {}

impl ZipkinCodec {
    /// Create a new Zipkin codec.
    pub fn new() -> Self {
        ZipkinCodec {}
    }

    /// Extract from a carrier exposing the span identity as typed
    /// accessors rather than a map.
    ///
    /// Unlike map extraction, a missing field here means the carrier
    /// has the wrong shape, not merely no context, and is an error.
    pub fn extract_from_fields(
        &self,
        carrier: &dyn SpanFieldCarrier,
    ) -> Result<Option<SpanContext>, PropagationError> {
        let trace_id = require_field(carrier.trace_id(), TRACE_ID_FIELD)?;
        let span_id = require_field(carrier.span_id(), SPAN_ID_FIELD)?;
        let parent_id = require_field(carrier.parent_id(), PARENT_ID_FIELD)?;
        let flags = require_field(carrier.trace_flags(), FLAGS_FIELD)?;

        if trace_id == 0 {
            return Ok(None);
        }
        let parent_id = if parent_id == 0 {
            None
        } else {
            Some(SpanId::from(parent_id))
        };
        Ok(Some(SpanContext::new(
            TraceId::from(trace_id),
            SpanId::from(span_id),
            parent_id,
            TraceFlags::new(flags),
        )))
    }
}

impl Codec for ZipkinCodec {
    type InjectCarrier = HashMap<String, u128>;
    type ExtractCarrier = HashMap<String, u128>;

    fn inject(&self, context: &SpanContext, carrier: &mut Self::InjectCarrier) {
        carrier.insert(TRACE_ID_FIELD.to_string(), context.trace_id().to_u128());
        carrier.insert(
            SPAN_ID_FIELD.to_string(),
            u128::from(context.span_id().to_u64()),
        );
        carrier.insert(
            PARENT_ID_FIELD.to_string(),
            u128::from(context.parent_id().unwrap_or(SpanId::INVALID).to_u64()),
        );
        carrier.insert(
            FLAGS_FIELD.to_string(),
            u128::from(context.trace_flags().to_u8()),
        );
    }

    fn extract(
        &self,
        carrier: &Self::ExtractCarrier,
    ) -> Result<Option<SpanContext>, PropagationError> {
        let trace_id = carrier.get(TRACE_ID_FIELD).copied();
        let span_id = read_u64_field(carrier, SPAN_ID_FIELD)?;
        let parent_id = read_u64_field(carrier, PARENT_ID_FIELD)?;
        let flags = read_u8_field(carrier, FLAGS_FIELD)?;

        let trace_id = match trace_id {
            Some(id) if id != 0 => TraceId::from(id),
            _ => return Ok(None),
        };
        let span_id = SpanId::from(span_id.unwrap_or_default());
        let parent_id = parent_id.filter(|&id| id != 0).map(SpanId::from);
        let flags = TraceFlags::new(flags.unwrap_or_default());
        Ok(Some(SpanContext::new(trace_id, span_id, parent_id, flags)))
    }
}

fn require_field<T>(value: Option<T>, field: &str) -> Result<T, PropagationError> {
    value.ok_or_else(|| PropagationError::InvalidCarrier(format!("carrier has no {field}")))
}

fn read_u64_field(
    carrier: &HashMap<String, u128>,
    field: &str,
) -> Result<Option<u64>, PropagationError> {
    carrier
        .get(field)
        .map(|&value| {
            u64::try_from(value).map_err(|_| {
                PropagationError::ContextCorrupted(format!(
                    "field {field} value {value:#x} does not fit in 64 bits"
                ))
            })
        })
        .transpose()
}

fn read_u8_field(
    carrier: &HashMap<String, u128>,
    field: &str,
) -> Result<Option<u8>, PropagationError> {
    carrier
        .get(field)
        .map(|&value| {
            u8::try_from(value).map_err(|_| {
                PropagationError::ContextCorrupted(format!(
                    "field {field} value {value:#x} does not fit in 8 bits"
                ))
            })
        })
        .transpose()
}
