//! Benchmarks for frame decoding and queue formatting
//!
//! Run with: cargo bench

use busdata_monitor::protocol::{decode, decode_hex, extract_bits, ProtocolSchema};
use busdata_monitor::types::{format_hex, parse_hex};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Schema with `n` packed 12-bit unsigned fields
fn packed_schema(n: usize) -> ProtocolSchema {
    let fields: Vec<String> = (0..n)
        .map(|i| {
            let start = i * 12;
            format!(
                r#"{{"name": "f{}", "byte_offset": {}, "bit_offset": {}, "bit_length": 12, "type": "uint"}}"#,
                i,
                start / 8,
                start % 8
            )
        })
        .collect();
    let text = format!(
        r#"{{"protocol_length": {}, "fields": [{}]}}"#,
        (n * 12).div_ceil(8),
        fields.join(",")
    );
    ProtocolSchema::from_json("packed", &text).expect("valid schema")
}

fn mixed_schema() -> ProtocolSchema {
    ProtocolSchema::from_json(
        "mixed",
        r#"{
            "protocol_length": 8,
            "fields": [
                {"name": "flag", "byte_offset": 0, "bit_offset": 0, "bit_length": 1, "type": "uint"},
                {"name": "mode", "byte_offset": 0, "bit_offset": 1, "bit_length": 3, "type": "enum",
                 "map": "0:Idle,1:Align,2:Nav,3:Fault"},
                {"name": "trim", "byte_offset": 0, "bit_offset": 4, "bit_length": 4, "type": "int"},
                {"name": "heading", "byte_offset": 1, "bit_offset": 0, "bit_length": 16, "type": "fixed",
                 "scale": 0.01},
                {"name": "speed", "byte_offset": 3, "bit_offset": 0, "bit_length": 16, "type": "fixed",
                 "scale": 0.1, "offset": -100.0, "signed": true},
                {"name": "counter", "byte_offset": 5, "bit_offset": 0, "bit_length": 24, "type": "uint"}
            ]
        }"#,
    )
    .expect("valid schema")
}

fn bench_decode_field_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_field_count");

    for count in [4, 16, 64, 256].iter() {
        let schema = packed_schema(*count);
        let payload: Vec<u8> = (0..schema.frame_length_bytes).map(|i| i as u8).collect();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| black_box(decode(&schema, black_box(&payload))))
        });
    }

    group.finish();
}

fn bench_decode_mixed(c: &mut Criterion) {
    let schema = mixed_schema();
    let payload = [0xA5, 0x30, 0x39, 0x80, 0x10, 0x00, 0x01, 0x02];
    let text = format_hex(&payload, true);

    c.bench_function("decode_mixed_bytes", |b| {
        b.iter(|| black_box(decode(&schema, black_box(&payload))))
    });
    c.bench_function("decode_mixed_hex", |b| {
        b.iter(|| black_box(decode_hex(&schema, black_box(&text))))
    });
}

fn bench_extract_bits(c: &mut Criterion) {
    let payload: Vec<u8> = (0..64u8).collect();
    let mut group = c.benchmark_group("extract_bits");

    for (start, length) in [(0usize, 8usize), (3, 13), (5, 64)].iter() {
        group.bench_with_input(
            BenchmarkId::new("unaligned", format!("{}+{}", start, length)),
            &(*start, *length),
            |b, &(start, length)| b.iter(|| black_box(extract_bits(&payload, start, length))),
        );
    }

    group.finish();
}

fn bench_hex_formatting(c: &mut Criterion) {
    let payload: Vec<u8> = (0..32u8).collect();
    let text = format_hex(&payload, true);

    c.bench_function("format_hex_32", |b| {
        b.iter(|| black_box(format_hex(black_box(&payload), true)))
    });
    c.bench_function("parse_hex_32", |b| b.iter(|| black_box(parse_hex(black_box(&text)))));
}

criterion_group!(
    benches,
    bench_decode_field_count,
    bench_decode_mixed,
    bench_extract_bits,
    bench_hex_formatting,
);

criterion_main!(benches);
