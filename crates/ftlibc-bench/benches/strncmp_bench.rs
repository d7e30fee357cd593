//! Bounded string comparison microbenchmarks.
//!
//! Compares the safe core against the exported C entry point over the same
//! buffers, so the cost of the pointer scan and mode dispatch is visible.

use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ftlibc_abi::string_abi::ft_strncmp;
use ftlibc_bench::{LENGTHS, PairShape, mode_label, pair};
use ftlibc_core::string::strncmp;

fn print_env_metadata_once() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let mode_raw = std::env::var(ftlibc_abi::runtime_policy::MODE_ENV)
            .unwrap_or_else(|_| "<unset>".to_string());
        println!("STRNCMP_BENCH_META ftlibc_mode_env={mode_raw}");
    });
}

fn bench_core_strncmp(c: &mut Criterion) {
    print_env_metadata_once();
    let mut group = c.benchmark_group("strncmp_core");
    for shape in PairShape::ALL {
        for len in LENGTHS {
            let (lhs, rhs) = pair(shape, len);
            group.throughput(Throughput::Bytes(len as u64));
            group.bench_with_input(BenchmarkId::new(shape.as_str(), len), &len, |b, &n| {
                b.iter(|| strncmp(black_box(&lhs), black_box(&rhs), black_box(n)));
            });
        }
    }
    group.finish();
}

fn bench_abi_strncmp(c: &mut Criterion) {
    print_env_metadata_once();
    let mode = mode_label();
    let mut group = c.benchmark_group(format!("ft_strncmp_{mode}"));
    for shape in PairShape::ALL {
        for len in LENGTHS {
            let (lhs, rhs) = pair(shape, len);
            group.throughput(Throughput::Bytes(len as u64));
            group.bench_with_input(BenchmarkId::new(shape.as_str(), len), &len, |b, &n| {
                b.iter_custom(|iters| {
                    let start = Instant::now();
                    for _ in 0..iters {
                        // SAFETY: both buffers are NUL-terminated and outlive the call.
                        let rc = unsafe {
                            ft_strncmp(
                                black_box(lhs.as_ptr().cast()),
                                black_box(rhs.as_ptr().cast()),
                                black_box(n),
                            )
                        };
                        black_box(rc);
                    }
                    start.elapsed().max(Duration::from_nanos(1))
                });
            });
        }
    }
    group.finish();
}

fn bench_unbounded_count(c: &mut Criterion) {
    let (lhs, rhs) = pair(PairShape::LateMismatch, 256);
    let mut group = c.benchmark_group("strncmp_unbounded");
    group.bench_function("usize_max", |b| {
        b.iter(|| strncmp(black_box(&lhs), black_box(&rhs), black_box(usize::MAX)));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_core_strncmp,
    bench_abi_strncmp,
    bench_unbounded_count
);
criterion_main!(benches);
