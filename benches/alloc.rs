// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Allocation benchmarks.
//
// Run with:
//   cargo bench --bench alloc
//
// Groups:
//   vec_baseline   — Vec<u8> via the global allocator
//   arena_alloc    — arena allocate + fill, reset between iterations
//   arena_reuse    — allocate/reset cycles against a retained chain
//   arena_padded   — mixed-type allocation through the padded byte arena
//
// Each group exercises the same workload at three sizes:
//   small  — 48 bytes  (well inside one block)
//   medium — 256 bytes (a few elements per block boundary)
//   large  — 4096 bytes (spans several 1 KiB blocks)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use libarena::{Arena, ArenaFlags, ArenaOptions, RetentionPolicy, TypedArena};

const SMALL: usize = 48;
const MEDIUM: usize = 256;
const LARGE: usize = 4096;

const SIZES: &[(&str, usize)] = &[
    ("small_48", SMALL),
    ("medium_256", MEDIUM),
    ("large_4096", LARGE),
];

fn retained_arena() -> TypedArena<u8> {
    TypedArena::with_options(
        ArenaOptions::new()
            .exact_block_size_bytes(1024)
            .retention(RetentionPolicy::Everything),
    )
    .expect("arena construction")
}

// ---------------------------------------------------------------------------
// Baseline: global allocator (Vec<u8>)
// ---------------------------------------------------------------------------

fn bench_vec_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("vec_baseline");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            b.iter(|| {
                let v: Vec<u8> = vec![0xABu8; sz];
                black_box(v)
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Arena: allocate + fill, reset each iteration
// ---------------------------------------------------------------------------

fn bench_arena_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_alloc");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let mut arena = retained_arena();
            b.iter(|| {
                let seq = arena.allocate(sz).expect("allocate");
                seq.fill(0xAB);
                black_box(seq.len());
                arena.reset().expect("reset");
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Arena: many allocations per reset (steady-state reuse)
// ---------------------------------------------------------------------------

fn bench_arena_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_reuse");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64 * 16));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let mut arena = retained_arena();
            b.iter(|| {
                for _ in 0..16 {
                    let seq = arena.allocate(sz).expect("allocate");
                    black_box(seq.len());
                }
                arena.reset().expect("reset");
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Padded multi-type arena: interleaved element sizes
// ---------------------------------------------------------------------------

fn bench_arena_padded(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_padded");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let arena = Arena::with_options(
                ArenaOptions::new()
                    .exact_block_size_bytes(1024)
                    .retention(RetentionPolicy::Everything)
                    .flags(ArenaFlags::PADDED_SHARING),
            );
            b.iter(|| {
                let bytes = arena.allocate::<u8>(sz / 2).expect("u8");
                let ints = arena.allocate::<u32>(sz / 8).expect("u32");
                black_box(bytes.len() + ints.len());
                arena.reset().expect("reset");
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_vec_baseline,
    bench_arena_alloc,
    bench_arena_reuse,
    bench_arena_padded
);
criterion_main!(benches);
