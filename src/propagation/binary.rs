//! # Jaeger binary codec
//!
//! Serializes span contexts into the fixed binary layout used for
//! in-process and wire transport: a 37-byte big-endian header holding
//! trace id (two u64 halves), span id, parent id, flags and the
//! baggage count, followed by length-prefixed baggage strings.

use std::collections::HashMap;

use crate::propagation::{Codec, PropagationError};
use crate::span_context::{SpanContext, SpanId, TraceFlags, TraceId};

/// `BinaryCodec` implements the Jaeger binary propagation format.
///
/// Inject appends the encoded context to the carrier. Extract reads one
/// context from the front of the carrier and ignores any trailing
/// bytes; it never answers `Ok(None)`, since even an all-zero buffer
/// decodes to a (degraded) context.
///
/// The wire format carries the baggage count and each string length as
/// a big-endian `u32`, which bounds baggage at `u32::MAX` entries and
/// each key or value at `u32::MAX` bytes.
#[derive(Clone, Debug, Default)]
pub struct BinaryCodec {}

impl BinaryCodec {
    /// Create a new binary codec.
    pub fn new() -> Self {
        BinaryCodec {}
    }
}

impl Codec for BinaryCodec {
    type InjectCarrier = Vec<u8>;
    type ExtractCarrier = [u8];

    fn inject(&self, context: &SpanContext, carrier: &mut Self::InjectCarrier) {
        let baggage = context.baggage();
        carrier.extend_from_slice(&context.trace_id().to_bytes());
        carrier.extend_from_slice(&context.span_id().to_bytes());
        carrier.extend_from_slice(
            &context
                .parent_id()
                .unwrap_or(SpanId::INVALID)
                .to_bytes(),
        );
        carrier.push(context.trace_flags().to_u8());
        carrier.extend_from_slice(&(baggage.len() as u32).to_be_bytes());
        for (key, value) in baggage {
            write_string(carrier, key);
            write_string(carrier, value);
        }
    }

    fn extract(
        &self,
        carrier: &Self::ExtractCarrier,
    ) -> Result<Option<SpanContext>, PropagationError> {
        let mut data = carrier;
        let trace_id = TraceId::from_bytes(read_array(&mut data)?);
        let span_id = SpanId::from_bytes(read_array(&mut data)?);
        let parent_id = SpanId::from_bytes(read_array(&mut data)?);
        let flags = TraceFlags::new(read_array::<1>(&mut data)?[0]);
        let baggage_count = u32::from_be_bytes(read_array(&mut data)?);

        // sized by what the buffer actually yields, not by the count field
        let mut baggage = HashMap::new();
        for _ in 0..baggage_count {
            let key = read_string(&mut data)?;
            let value = read_string(&mut data)?;
            baggage.insert(key, value);
        }

        let parent_id = if parent_id == SpanId::INVALID {
            None
        } else {
            Some(parent_id)
        };
        Ok(Some(
            SpanContext::new(trace_id, span_id, parent_id, flags).with_baggage(baggage),
        ))
    }
}

fn write_string(carrier: &mut Vec<u8>, value: &str) {
    carrier.extend_from_slice(&(value.len() as u32).to_be_bytes());
    carrier.extend_from_slice(value.as_bytes());
}

fn take<'a>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], PropagationError> {
    if data.len() < len {
        return Err(PropagationError::ContextCorrupted(format!(
            "span context data truncated, expected {len} more bytes, found {}",
            data.len()
        )));
    }
    let (head, rest) = data.split_at(len);
    *data = rest;
    Ok(head)
}

fn read_array<const N: usize>(data: &mut &[u8]) -> Result<[u8; N], PropagationError> {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(take(data, N)?);
    Ok(bytes)
}

fn read_string(data: &mut &[u8]) -> Result<String, PropagationError> {
    let len = u32::from_be_bytes(read_array(data)?) as usize;
    let bytes = take(data, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        PropagationError::ContextCorrupted("baggage string is not valid UTF-8".to_string())
    })
}
