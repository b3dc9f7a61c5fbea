//! Benchmarks for range decomposition and interval decoding.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use fwset::decompose::{decompose, render};
use fwset::interval::{boundaries, decode};
use fwset::range::AddressRange;

/// Deliberately unaligned IPv4 ranges of growing width
fn unaligned_v4_ranges(count: u32) -> Vec<AddressRange> {
    (0..count)
        .map(|i| {
            let start = 0x0a00_0000 + i * 4096 + 1;
            let end = start + 1000 + (i % 2000);
            AddressRange::new(
                IpAddr::V4(Ipv4Addr::from(start)),
                IpAddr::V4(Ipv4Addr::from(end)),
            )
            .unwrap()
        })
        .collect()
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");

    for size in [100, 1000, 10000] {
        let ranges = unaligned_v4_ranges(size);
        group.bench_with_input(BenchmarkId::new("ipv4_unaligned", size), &ranges, |b, ranges| {
            b.iter(|| {
                for range in ranges {
                    black_box(decompose(range));
                }
            });
        });
    }

    // Worst case: every prefix length appears twice
    let widest = AddressRange::new(
        IpAddr::V6(Ipv6Addr::from(1u128)),
        IpAddr::V6(Ipv6Addr::from(u128::MAX - 1)),
    )
    .unwrap();
    group.bench_function("ipv6_full_width", |b| b.iter(|| black_box(render(&widest))));

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [100, 1000, 10000] {
        let mut elements = Vec::new();
        for range in unaligned_v4_ranges(size) {
            elements.extend(boundaries(&range));
        }
        elements.reverse();
        group.bench_with_input(BenchmarkId::new("ipv4", size), &elements, |b, elements| {
            b.iter(|| black_box(decode(elements).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decompose, bench_decode);
criterion_main!(benches);
