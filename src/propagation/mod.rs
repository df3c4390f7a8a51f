//! # Propagation codecs
//!
//! Codecs convert an in-memory [`SpanContext`] to and from the wire
//! representations carried on RPC headers or binary buffers. Each wire
//! format has its own codec type:
//!
//! - [`TextCodec`](text::TextCodec), the Jaeger header format
//!   (`uber-trace-id` plus `uberctx-` baggage headers)
//! - [`BinaryCodec`](binary::BinaryCodec), the compact big-endian byte
//!   format
//! - [`ZipkinCodec`](zipkin::ZipkinCodec), the numeric field format used
//!   for TChannel interop
//! - [`B3Codec`](b3::B3Codec), the multi-header B3 format
//!
//! Header codecs read and write their carriers through the [`Injector`]
//! and [`Extractor`] traits, so any string-keyed header container can be
//! used; `HashMap<String, String>` works out of the box.

use std::collections::HashMap;

use thiserror::Error;

use crate::span_context::SpanContext;

pub mod b3;
pub mod binary;
pub mod text;
pub mod zipkin;

/// A propagation codec converts a [`SpanContext`] to and from one wire
/// representation.
///
/// The carrier shape a codec operates on is part of its type: header
/// codecs use [`Injector`]/[`Extractor`] trait objects, the binary codec
/// a byte buffer, the Zipkin codec a numeric field map. Handing a codec
/// a carrier of the wrong shape is a compile error rather than a runtime
/// one.
pub trait Codec {
    /// Carrier mutated by [`inject`](Codec::inject).
    type InjectCarrier: ?Sized;

    /// Carrier read by [`extract`](Codec::extract).
    type ExtractCarrier: ?Sized;

    /// Write `context` into the carrier.
    fn inject(&self, context: &SpanContext, carrier: &mut Self::InjectCarrier);

    /// Read a [`SpanContext`] out of the carrier.
    ///
    /// Returns `Ok(None)` when the carrier holds no trace data at all;
    /// that is the normal case for requests arriving from untraced
    /// callers, not an error.
    fn extract(
        &self,
        carrier: &Self::ExtractCarrier,
    ) -> Result<Option<SpanContext>, PropagationError>;
}

/// Errors returned by the extract half of a [`Codec`].
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum PropagationError {
    /// The carrier cannot satisfy the shape the codec requires, e.g. an
    /// attribute carrier missing one of the span fields. This is a bug
    /// in the calling code, not bad data from the network.
    #[error("invalid carrier: {0}")]
    InvalidCarrier(String),

    /// The carrier has the right shape but its payload does not decode
    /// as a span context.
    #[error("span context corrupted: {0}")]
    ContextCorrupted(String),
}

/// Injector provides an interface for adding fields to an underlying
/// struct like `HashMap`.
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);

    #[allow(unused_variables)]
    /// Hint to reserve capacity for at least `additional` more entries to be inserted.
    fn reserve(&mut self, additional: usize) {}
}

/// Extractor provides an interface for reading fields from an underlying
/// struct like `HashMap`.
///
/// `get` is responsible for handling case sensitivity; carriers backed
/// by case-insensitive protocols must match keys regardless of casing.
pub trait Extractor {
    /// Get a value for a key from the underlying data.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys from the underlying data.
    fn keys(&self) -> Vec<&str>;

    /// Get all values for a key from the underlying data.
    ///
    /// Carriers that can hold repeated keys should override this; the
    /// default wraps the single `get` value.
    fn get_all(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key).map(|value| vec![value])
    }
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    /// Set a key and value in the HashMap.
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }

    /// Reserves capacity for at least `additional` more entries to be inserted.
    fn reserve(&mut self, additional: usize) {
        self.reserve(additional);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    /// Get a value for a key from the HashMap.
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    /// Collect all the keys from the HashMap.
    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_get() {
        let mut carrier = HashMap::new();
        carrier.set("headerName", "value".to_string());

        assert_eq!(
            Extractor::get(&carrier, "HEADERNAME"),
            Some("value"),
            "case insensitive extraction"
        );
        assert_eq!(
            Extractor::get_all(&carrier, "HEADERNAME"),
            Some(vec!["value"]),
            "case insensitive get_all extraction"
        );
        assert_eq!(Extractor::get_all(&carrier, "absent"), None);
    }

    #[test]
    fn hash_map_keys() {
        let mut carrier = HashMap::new();
        carrier.set("headerName1", "value1".to_string());
        carrier.set("headerName2", "value2".to_string());

        let got = Extractor::keys(&carrier);
        assert_eq!(got.len(), 2);
        assert!(got.contains(&"headername1"));
        assert!(got.contains(&"headername2"));
    }

    #[test]
    fn hash_map_reserve() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        Injector::reserve(&mut carrier, 16);
        assert!(carrier.capacity() >= 16);
    }

    #[test]
    fn injector_default_reserve() {
        struct TestInjector;
        impl Injector for TestInjector {
            fn set(&mut self, _key: &str, _value: String) {}
        }

        let mut test_injector = TestInjector;
        Injector::reserve(&mut test_injector, 4711);
        Injector::set(&mut test_injector, "key", "value".to_string());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            PropagationError::InvalidCarrier("carrier has no trace_id".to_string()).to_string(),
            "invalid carrier: carrier has no trace_id"
        );
        assert_eq!(
            PropagationError::ContextCorrupted("malformed trace context \"x\"".to_string())
                .to_string(),
            "span context corrupted: malformed trace context \"x\""
        );
    }
}
