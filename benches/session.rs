//! Session rule benchmarks.
//!
//! Run with: cargo bench --bench session
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use secure_api::session::{resolve_dapps_url, sanitize_token};

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_sanitize_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize_token");

    group.bench_function("clean", |b| {
        b.iter(|| sanitize_token(black_box("AbCdEf0123456789AbCdEf0123456789")))
    });

    group.bench_function("noisy", |b| {
        b.iter(|| sanitize_token(black_box("AbCd-Ef01 2345_6789!AbCd-Ef01 2345_6789?")))
    });

    group.finish();
}

fn bench_dapps_url(c: &mut Criterion) {
    c.bench_function("resolve_dapps_url", |b| {
        b.iter(|| {
            resolve_dapps_url(
                black_box("127.0.0.1"),
                black_box(Some("0.0.0.0")),
                black_box(8080),
            )
        })
    });
}

criterion_group!(benches, bench_sanitize_token, bench_dapps_url);
criterion_main!(benches);
