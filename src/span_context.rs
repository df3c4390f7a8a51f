//! In-memory representation of a propagated span context.

use std::collections::HashMap;
use std::fmt;
use std::num::ParseIntError;
use std::ops::{BitAnd, BitOr};

/// Flags that can be set on a [`SpanContext`].
///
/// Jaeger defines two flag bits: [`TraceFlags::SAMPLED`] and
/// [`TraceFlags::DEBUG`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// Trace flags with the `sampled` flag set to `1`.
    ///
    /// Spans that are not sampled will be ignored by most tracing tools.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Trace flags with the `debug` flag set to `1`.
    ///
    /// Debug traces originate from a debug request and are expected to
    /// survive downstream sampling.
    pub const DEBUG: TraceFlags = TraceFlags(0x02);

    /// Construct new trace flags.
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Returns `true` if the `sampled` flag is set.
    pub fn is_sampled(&self) -> bool {
        (*self & TraceFlags::SAMPLED) == TraceFlags::SAMPLED
    }

    /// Returns `true` if the `debug` flag is set.
    pub fn is_debug(&self) -> bool {
        (*self & TraceFlags::DEBUG) == TraceFlags::DEBUG
    }

    /// Returns the flags as a `u8`.
    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::LowerHex for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// A 16-byte value which identifies a given trace.
///
/// The id is valid if it contains at least one non-zero byte.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Invalid trace id.
    pub const INVALID: TraceId = TraceId(0);

    /// Create a trace id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(u128::from_be_bytes(bytes))
    }

    /// Return the representation of this trace id as a byte array.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Converts a string in base 16 to a trace id.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u128::from_str_radix(hex, 16).map(TraceId)
    }

    /// Returns the trace id as a `u128`.
    pub fn to_u128(self) -> u128 {
        self.0
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId(value)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// An 8-byte value which identifies a given span.
///
/// The id is valid if it contains at least one non-zero byte.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Invalid span id.
    pub const INVALID: SpanId = SpanId(0);

    /// Create a span id from its representation as a byte array.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(u64::from_be_bytes(bytes))
    }

    /// Return the representation of this span id as a byte array.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Converts a string in base 16 to a span id.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }

    /// Returns the span id as a `u64`.
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Immutable propagated state of a span: identifiers, flags, baggage and
/// the debug correlation id.
///
/// `parent_id` is `None` for root spans; every wire format encodes an
/// absent parent as `0`. A context extracted from a carrier that held
/// only baggage or a debug id has both ids set to the invalid zero value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    parent_id: Option<SpanId>,
    flags: TraceFlags,
    baggage: HashMap<String, String>,
    debug_id: Option<String>,
}

impl SpanContext {
    /// Construct a new context with no baggage and no debug id.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        parent_id: Option<SpanId>,
        flags: TraceFlags,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            parent_id,
            flags,
            baggage: HashMap::new(),
            debug_id: None,
        }
    }

    /// Consume the context, replacing its baggage.
    pub fn with_baggage(mut self, baggage: HashMap<String, String>) -> Self {
        self.baggage = baggage;
        self
    }

    /// Consume the context, adding one baggage item.
    pub fn with_baggage_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.baggage.insert(key.into(), value.into());
        self
    }

    /// Consume the context, setting the debug correlation id.
    pub fn with_debug_id(mut self, debug_id: impl Into<String>) -> Self {
        self.debug_id = Some(debug_id.into());
        self
    }

    /// The id of the trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The id of this span.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The id of the parent span, or `None` for a root span.
    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    /// Returns the flags of this context.
    pub fn trace_flags(&self) -> TraceFlags {
        self.flags
    }

    /// Baggage items travelling with this context.
    pub fn baggage(&self) -> &HashMap<String, String> {
        &self.baggage
    }

    /// The debug correlation id, if one was received.
    pub fn debug_id(&self) -> Option<&str> {
        self.debug_id.as_deref()
    }

    /// Returns `true` if both the trace id and the span id are non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// Returns `true` if the `sampled` flag is set.
    pub fn is_sampled(&self) -> bool {
        self.flags.is_sampled()
    }

    /// Returns `true` if the `debug` flag is set.
    pub fn is_debug(&self) -> bool {
        self.flags.is_debug()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn trace_id_test_data() -> Vec<(TraceId, &'static str, [u8; 16])> {
        vec![
            (TraceId(0), "00000000000000000000000000000000", [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            (TraceId(42), "0000000000000000000000000000002a", [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 42]),
            (TraceId(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10), "0102030405060708090a0b0c0d0e0f10", [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
        ]
    }

    #[rustfmt::skip]
    fn span_id_test_data() -> Vec<(SpanId, &'static str, [u8; 8])> {
        vec![
            (SpanId(0), "0000000000000000", [0, 0, 0, 0, 0, 0, 0, 0]),
            (SpanId(42), "000000000000002a", [0, 0, 0, 0, 0, 0, 0, 42]),
            (SpanId(0x3d0c_8e41_b0b0_97a6), "3d0c8e41b0b097a6", [61, 12, 142, 65, 176, 176, 151, 166]),
        ]
    }

    #[test]
    fn test_trace_id() {
        for test_case in trace_id_test_data() {
            assert_eq!(format!("{}", test_case.0), test_case.1);
            assert_eq!(format!("{:032x}", test_case.0), test_case.1);
            assert_eq!(test_case.0.to_bytes(), test_case.2);

            assert_eq!(test_case.0, TraceId::from_hex(test_case.1).unwrap());
            assert_eq!(test_case.0, TraceId::from_bytes(test_case.2));
        }
    }

    #[test]
    fn test_span_id() {
        for test_case in span_id_test_data() {
            assert_eq!(format!("{}", test_case.0), test_case.1);
            assert_eq!(format!("{:016x}", test_case.0), test_case.1);
            assert_eq!(test_case.0.to_bytes(), test_case.2);

            assert_eq!(test_case.0, SpanId::from_hex(test_case.1).unwrap());
            assert_eq!(test_case.0, SpanId::from_bytes(test_case.2));
        }
    }

    #[test]
    fn test_trace_flags() {
        assert!(!TraceFlags::default().is_sampled());
        assert!(!TraceFlags::default().is_debug());

        let sampled = TraceFlags::SAMPLED;
        assert!(sampled.is_sampled());
        assert!(!sampled.is_debug());

        let both = TraceFlags::SAMPLED | TraceFlags::DEBUG;
        assert!(both.is_sampled());
        assert!(both.is_debug());
        assert_eq!(both.to_u8(), 0x03);
        assert_eq!(format!("{:x}", both), "3");
    }

    #[test]
    fn test_context_validity() {
        let context = SpanContext::new(
            TraceId::from(1u128),
            SpanId::from(2u64),
            None,
            TraceFlags::SAMPLED,
        );
        assert!(context.is_valid());
        assert!(context.is_sampled());
        assert!(!context.is_debug());
        assert_eq!(context.parent_id(), None);

        let degraded = SpanContext::new(
            TraceId::INVALID,
            SpanId::INVALID,
            None,
            TraceFlags::default(),
        )
        .with_baggage_item("account", "12345");
        assert!(!degraded.is_valid());
        assert_eq!(degraded.baggage().get("account").map(String::as_str), Some("12345"));

        let debug_only = SpanContext::new(
            TraceId::INVALID,
            SpanId::INVALID,
            None,
            TraceFlags::default(),
        )
        .with_debug_id("some-correlation-id");
        assert!(!debug_only.is_valid());
        assert_eq!(debug_only.debug_id(), Some("some-correlation-id"));
    }
}
