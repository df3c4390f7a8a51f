use std::collections::HashMap;

use criterion::{criterion_group, criterion_main, Criterion};

use jaeger_propagation::{BinaryCodec, Codec, SpanContext, SpanId, TextCodec, TraceFlags, TraceId};

fn sampled_context() -> SpanContext {
    SpanContext::new(
        TraceId::from(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10u128),
        SpanId::from(0x3d0c_8e41_b0b0_97a6u64),
        Some(SpanId::from(0x17c2_9eb7_0014_92b5u64)),
        TraceFlags::SAMPLED,
    )
    .with_baggage_item("account", "billing")
    .with_baggage_item("locale", "en_US")
}

fn benchmark_text_inject(c: &mut Criterion) {
    let codec = TextCodec::new();
    let context = sampled_context();

    c.bench_function("text_inject", move |b| {
        b.iter(|| {
            let mut carrier: HashMap<String, String> = HashMap::new();
            codec.inject(&context, &mut carrier);
            carrier
        })
    });
}

fn benchmark_text_extract(c: &mut Criterion) {
    let codec = TextCodec::new();
    let mut carrier: HashMap<String, String> = HashMap::new();
    codec.inject(&sampled_context(), &mut carrier);

    c.bench_function("text_extract", move |b| b.iter(|| codec.extract(&carrier)));
}

fn benchmark_binary_inject(c: &mut Criterion) {
    let codec = BinaryCodec::new();
    let context = sampled_context();

    c.bench_function("binary_inject", move |b| {
        b.iter(|| {
            let mut carrier = Vec::new();
            codec.inject(&context, &mut carrier);
            carrier
        })
    });
}

fn benchmark_binary_extract(c: &mut Criterion) {
    let codec = BinaryCodec::new();
    let mut carrier = Vec::new();
    codec.inject(&sampled_context(), &mut carrier);

    c.bench_function("binary_extract", move |b| b.iter(|| codec.extract(&carrier)));
}

criterion_group!(
    benches,
    benchmark_text_inject,
    benchmark_text_extract,
    benchmark_binary_inject,
    benchmark_binary_extract
);
criterion_main!(benches);
