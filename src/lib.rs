//! Span context propagation codecs for Jaeger-compatible tracing
//! systems.
//!
//! A [`SpanContext`] identifies one span within one trace: a trace id,
//! a span id, the parent span id, flag bits, plus baggage and an
//! optional debug correlation id. This crate converts span contexts to
//! and from the carriers that travel between processes:
//!
//! - [`TextCodec`]: the [jaeger propagation format] headers
//!   (`uber-trace-id`, `uberctx-*` baggage headers), for HTTP-like
//!   header maps
//! - [`BinaryCodec`]: the compact big-endian byte format
//! - [`ZipkinCodec`]: named numeric span fields, for TChannel-style
//!   in-process carriers
//! - [`B3Codec`]: the Zipkin B3 multi-header format
//!
//! Every codec implements [`Codec`], whose associated carrier types tie
//! each codec to the carrier shape it understands at compile time.
//! Header-based codecs address their carriers through the [`Injector`]
//! and [`Extractor`] traits; `HashMap<String, String>` implements both.
//!
//! ## Examples
//!
//! ```
//! use std::collections::HashMap;
//!
//! use jaeger_propagation::{Codec, SpanContext, SpanId, TextCodec, TraceFlags, TraceId};
//!
//! let codec = TextCodec::new();
//! let context = SpanContext::new(
//!     TraceId::from(1u128),
//!     SpanId::from(2u64),
//!     None,
//!     TraceFlags::SAMPLED,
//! )
//! .with_baggage_item("account", "billing");
//!
//! // inject into the headers of an outgoing request
//! let mut headers: HashMap<String, String> = HashMap::new();
//! codec.inject(&context, &mut headers);
//! assert_eq!(headers.get("uber-trace-id"), Some(&"1:2:0:1".to_string()));
//! assert_eq!(headers.get("uberctx-account"), Some(&"billing".to_string()));
//!
//! // extract on the receiving side
//! let extracted = codec.extract(&headers)?;
//! assert_eq!(extracted, Some(context));
//! # Ok::<(), jaeger_propagation::PropagationError>(())
//! ```
//!
//! [jaeger propagation format]: https://www.jaegertracing.io/docs/1.18/client-libraries/#propagation-format
//!
//! # Supported Rust Versions
//!
//! This crate is built against the latest stable release. The minimum
//! supported version is 1.65. The current version is not guaranteed to
//! build on Rust versions earlier than the minimum supported version.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(
    docsrs,
    feature(doc_cfg, doc_auto_cfg),
    deny(rustdoc::broken_intra_doc_links)
)]
#![cfg_attr(test, deny(warnings))]

pub mod propagation;
pub mod span_context;

pub use propagation::b3::B3Codec;
pub use propagation::binary::BinaryCodec;
pub use propagation::text::{span_context_from_header, span_context_to_header, TextCodec};
pub use propagation::zipkin::{SpanFieldCarrier, ZipkinCodec, ZIPKIN_SPAN_FORMAT};
pub use propagation::{Codec, Extractor, Injector, PropagationError};
pub use span_context::{SpanContext, SpanId, TraceFlags, TraceId};
