//! # Jaeger text codec
//!
//! Propagates span contexts as HTTP-style headers: one combined header
//! for the trace identity, one `uberctx-`-prefixed header per baggage
//! item, plus the inbound-only debug and ad-hoc baggage headers.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::propagation::{Codec, Extractor, Injector, PropagationError};
use crate::span_context::{SpanContext, SpanId, TraceFlags, TraceId};

/// Default name of the header holding the combined trace context.
pub const TRACE_ID_HEADER: &str = "uber-trace-id";
/// Default prefix of the per-item baggage headers.
pub const BAGGAGE_HEADER_PREFIX: &str = "uberctx-";
/// Default name of the header carrying a debug correlation id.
pub const DEBUG_ID_HEADER: &str = "jaeger-debug-id";
/// Default name of the header carrying comma-separated ad-hoc baggage.
pub const BAGGAGE_HEADER: &str = "jaeger-baggage";

// Unreserved characters plus '/' stay literal.
const BAGGAGE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// `TextCodec` implements the Jaeger header propagation format.
///
/// On inject it writes the combined trace header and one header per
/// baggage item. On extract it additionally understands the debug-id
/// header and the aggregated baggage header, which have no inject
/// counterpart.
///
/// A malformed combined header does not fail extraction: the trace
/// identifiers are dropped and any baggage or debug id in the carrier
/// still comes through.
#[derive(Clone, Debug)]
pub struct TextCodec {
    url_encoding: bool,
    trace_id_header: String,
    baggage_prefix: String,
    debug_id_header: String,
    baggage_header: String,
    fields: [String; 1],
}

impl Default for TextCodec {
    fn default() -> Self {
        TextCodec::new()
    }
}

impl TextCodec {
    /// Create a text codec with the default header names and no URL
    /// encoding.
    pub fn new() -> Self {
        Self::with_custom_headers(
            TRACE_ID_HEADER,
            BAGGAGE_HEADER_PREFIX,
            DEBUG_ID_HEADER,
            BAGGAGE_HEADER,
            false,
        )
    }

    /// Create a text codec with the default header names.
    ///
    /// With `url_encoding` enabled, baggage values are percent-encoded
    /// on inject and every received header value is percent-decoded on
    /// extract. The combined trace header is never encoded on inject;
    /// its `:` separator is safe in header values.
    pub fn with_url_encoding(url_encoding: bool) -> Self {
        Self::with_custom_headers(
            TRACE_ID_HEADER,
            BAGGAGE_HEADER_PREFIX,
            DEBUG_ID_HEADER,
            BAGGAGE_HEADER,
            url_encoding,
        )
    }

    /// Create a text codec with custom header names.
    ///
    /// Configured names are lowercased with underscores replaced by
    /// hyphens, and an empty or blank name falls back to its default.
    /// The serialized format itself does not depend on the configured
    /// names.
    pub fn with_custom_headers(
        trace_id_header: &str,
        baggage_header_prefix: &str,
        debug_id_header: &str,
        baggage_header: &str,
        url_encoding: bool,
    ) -> Self {
        let trace_id_header = normalize_header_name(trace_id_header, TRACE_ID_HEADER);
        let baggage_prefix = normalize_header_name(baggage_header_prefix, BAGGAGE_HEADER_PREFIX);
        let debug_id_header = normalize_header_name(debug_id_header, DEBUG_ID_HEADER);
        let baggage_header = normalize_header_name(baggage_header, BAGGAGE_HEADER);

        TextCodec {
            url_encoding,
            fields: [trace_id_header.clone()],
            trace_id_header,
            baggage_prefix,
            debug_id_header,
            baggage_header,
        }
    }

    /// Header names this codec writes on every inject.
    ///
    /// Baggage header names are derived from baggage keys at inject time
    /// and are not listed.
    pub fn fields(&self) -> &[String] {
        self.fields.as_ref()
    }

    /// Decode the combined trace header value, applying the
    /// repeated-header check and URL decoding first.
    ///
    /// Any failure drops the trace identifiers; the rest of the carrier
    /// is still extracted.
    fn extract_trace_header(
        &self,
        extractor: &dyn Extractor,
        key: &str,
    ) -> Option<(TraceId, SpanId, Option<SpanId>, TraceFlags)> {
        let values = extractor.get_all(key)?;
        let value = match values.as_slice() {
            [value] => self.decode_value(value),
            values => {
                debug!(
                    header = self.trace_id_header.as_str(),
                    count = values.len(),
                    "trace context header must have exactly one value, ignoring trace identifiers"
                );
                return None;
            }
        };

        match span_context_from_header(&value) {
            Ok(context) => Some((
                context.trace_id(),
                context.span_id(),
                context.parent_id(),
                context.trace_flags(),
            )),
            Err(err) => {
                debug!(
                    header = self.trace_id_header.as_str(),
                    %err,
                    "malformed trace context header, ignoring trace identifiers"
                );
                None
            }
        }
    }

    fn decode_value(&self, value: &str) -> String {
        if self.url_encoding {
            percent_decode_str(value).decode_utf8_lossy().into_owned()
        } else {
            value.to_string()
        }
    }
}

impl Codec for TextCodec {
    type InjectCarrier = dyn Injector;
    type ExtractCarrier = dyn Extractor;

    fn inject(&self, context: &SpanContext, carrier: &mut Self::InjectCarrier) {
        carrier.reserve(1 + context.baggage().len());
        carrier.set(&self.trace_id_header, span_context_to_header(context));
        for (key, value) in context.baggage() {
            let value = if self.url_encoding {
                utf8_percent_encode(value, BAGGAGE_ENCODE_SET).to_string()
            } else {
                value.clone()
            };
            carrier.set(&format!("{}{}", self.baggage_prefix, key), value);
        }
    }

    fn extract(
        &self,
        carrier: &Self::ExtractCarrier,
    ) -> Result<Option<SpanContext>, PropagationError> {
        let mut trace_fields = None;
        let mut baggage: HashMap<String, String> = HashMap::new();
        let mut debug_id = None;

        for key in carrier.keys() {
            let lower_key = key.to_lowercase();
            if lower_key == self.trace_id_header {
                trace_fields = self.extract_trace_header(carrier, key);
            } else if let Some(item_key) = lower_key.strip_prefix(self.baggage_prefix.as_str()) {
                if let Some(value) = carrier.get(key) {
                    baggage.insert(item_key.to_string(), self.decode_value(value));
                }
            } else if lower_key == self.debug_id_header {
                if let Some(value) = carrier.get(key) {
                    // An empty debug id is the same as no debug id.
                    debug_id = Some(self.decode_value(value)).filter(|value| !value.is_empty());
                }
            } else if lower_key == self.baggage_header {
                if let Some(value) = carrier.get(key) {
                    parse_aggregated_baggage(&self.decode_value(value), &mut baggage);
                }
            }
        }

        if trace_fields.is_none() && debug_id.is_none() && baggage.is_empty() {
            return Ok(None);
        }

        let (trace_id, span_id, parent_id, flags) = trace_fields.unwrap_or((
            TraceId::INVALID,
            SpanId::INVALID,
            None,
            TraceFlags::default(),
        ));
        let mut context =
            SpanContext::new(trace_id, span_id, parent_id, flags).with_baggage(baggage);
        if let Some(debug_id) = debug_id {
            context = context.with_debug_id(debug_id);
        }
        Ok(Some(context))
    }
}

/// Serialize the trace identity of a context to the combined
/// `{trace_id}:{span_id}:{parent_id}:{flags}` header value.
///
/// Numbers are encoded as variable-length lower-case hex strings. An
/// absent parent id is written as `0`.
pub fn span_context_to_header(context: &SpanContext) -> String {
    format!(
        "{:x}:{:x}:{:x}:{:x}",
        context.trace_id(),
        context.span_id(),
        context.parent_id().unwrap_or(SpanId::INVALID),
        context.trace_flags(),
    )
}

/// Decode a combined `{trace_id}:{span_id}:{parent_id}:{flags}` header
/// value.
///
/// The returned context carries no baggage or debug id. Trace id and
/// span id must be non-zero; a parent id of `0` decodes as `None`.
pub fn span_context_from_header(value: &str) -> Result<SpanContext, PropagationError> {
    let malformed =
        || PropagationError::ContextCorrupted(format!("malformed trace context {value:?}"));

    let parts = value.split(':').collect::<Vec<&str>>();
    if parts.len() != 4 {
        return Err(malformed());
    }
    let trace_id = TraceId::from_hex(parts[0]).map_err(|_| malformed())?;
    let span_id = SpanId::from_hex(parts[1]).map_err(|_| malformed())?;
    let parent_id = SpanId::from_hex(parts[2]).map_err(|_| malformed())?;
    let flags = u8::from_str_radix(parts[3], 16)
        .map(TraceFlags::new)
        .map_err(|_| malformed())?;
    if trace_id == TraceId::INVALID || span_id == SpanId::INVALID {
        return Err(malformed());
    }

    let parent_id = if parent_id == SpanId::INVALID {
        None
    } else {
        Some(parent_id)
    };
    Ok(SpanContext::new(trace_id, span_id, parent_id, flags))
}

/// Parse the aggregated baggage header value: comma-separated
/// `key=value` pairs.
///
/// Each pair is trimmed as a whole and split on every `=`; anything
/// that does not yield exactly two tokens is skipped. Keys are kept
/// verbatim.
fn parse_aggregated_baggage(header: &str, baggage: &mut HashMap<String, String>) {
    for part in header.split(',') {
        let tokens = part.trim().split('=').collect::<Vec<&str>>();
        if let [key, value] = tokens.as_slice() {
            baggage.insert((*key).to_string(), (*value).to_string());
        }
    }
}

fn normalize_header_name(name: &str, default: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        default.to_string()
    } else {
        name.to_lowercase().replace('_', "-")
    }
}
