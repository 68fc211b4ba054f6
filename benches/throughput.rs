//! Throughput Benchmark for RespHub
//!
//! Measures the framing path: parsing pipelined input, the full dispatch
//! loop, and registry lookups under the read lock.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use resphub::protocol::{append_array_header, append_bulk, append_simple_string, read_commands};
use resphub::{Action, Command, ConnId, ConnectionRegistry, RespServer};
use std::sync::Arc;

fn pipeline(commands: usize, value_len: usize) -> Vec<u8> {
    let value = vec![b'x'; value_len];
    let mut buf = Vec::new();
    for i in 0..commands {
        append_array_header(&mut buf, 3);
        append_bulk(&mut buf, b"SET");
        append_bulk(&mut buf, format!("key:{}", i).as_bytes());
        append_bulk(&mut buf, &value);
    }
    buf
}

fn ok_handler(_cmd: Command, mut out: Vec<u8>) -> (Vec<u8>, Action) {
    append_simple_string(&mut out, "OK");
    (out, Action::None)
}

/// Benchmark parsing a pipelined buffer into commands
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &count in &[1usize, 16, 128] {
        let input = pipeline(count, 32);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("pipelined_set", count), &input, |b, input| {
            b.iter(|| black_box(read_commands(black_box(input)).unwrap()));
        });
    }

    let large = pipeline(1, 64 * 1024);
    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("set_64k_value", |b| {
        b.iter(|| black_box(read_commands(black_box(&large)).unwrap()));
    });

    group.finish();
}

/// Benchmark the dispatch loop, whole and split across two events
fn bench_dispatch(c: &mut Criterion) {
    let server = RespServer::new(ok_handler as fn(Command, Vec<u8>) -> (Vec<u8>, Action));
    let id = ConnId::new(1);
    server.registry().register(id).unwrap();

    let input = pipeline(16, 32);
    let (head, tail) = input.split_at(input.len() / 2 + 3);

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(16));

    group.bench_function("one_event", |b| {
        b.iter(|| black_box(server.react(id, black_box(&input))));
    });

    group.bench_function("split_event", |b| {
        b.iter(|| {
            black_box(server.react(id, black_box(head)));
            black_box(server.react(id, black_box(tail)))
        });
    });

    group.finish();
}

/// Benchmark registry lookups with many open connections
fn bench_registry(c: &mut Criterion) {
    let registry = Arc::new(ConnectionRegistry::new());
    for i in 0..10_000 {
        registry.register(ConnId::new(i)).unwrap();
    }

    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lookup_hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(registry.lookup(ConnId::new(i % 10_000)).is_ok());
            i += 1;
        });
    });

    group.bench_function("register_unregister", |b| {
        let mut i = 1_000_000u64;
        b.iter(|| {
            let id = ConnId::new(i);
            registry.register(id).unwrap();
            registry.unregister(id).unwrap();
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_dispatch, bench_registry);
criterion_main!(benches);
