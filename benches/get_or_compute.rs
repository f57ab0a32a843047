//! # Get-or-compute Benchmarks
//!
//! - **Hit path**: key resolution plus a backend read
//! - **Coalesced miss**: many concurrent callers sharing one computation
//! - **Uncached**: direct computation with the backend bypassed
//!
//! ```bash
//! cargo bench --bench get_or_compute
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ouroboros_cache::{CacheConfig, CacheFacade, ComputeOptions, MemoryBackend};
use std::sync::Arc;
use std::time::Duration;

fn setup_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime")
}

fn facade() -> CacheFacade {
    CacheFacade::new(
        Arc::new(MemoryBackend::with_defaults()),
        CacheConfig::default(),
    )
    .expect("default config is valid")
}

fn bench_hit_path(c: &mut Criterion) {
    let runtime = setup_runtime();
    let cache = facade();

    runtime.block_on(async {
        cache
            .get_or_compute(
                "warm",
                None,
                || async { Ok::<_, anyhow::Error>("cached payload") },
                ComputeOptions::default(),
            )
            .await
            .expect("warmup failed");
    });

    c.bench_function("get_or_compute_hit", |b| {
        b.to_async(&runtime).iter(|| async {
            cache
                .get_or_compute(
                    "warm",
                    None,
                    || async { Ok::<_, anyhow::Error>("unused") },
                    ComputeOptions::default(),
                )
                .await
                .expect("hit failed")
        })
    });
}

fn bench_coalesced_miss(c: &mut Criterion) {
    let runtime = setup_runtime();
    let mut group = c.benchmark_group("coalesced_miss");
    group.measurement_time(Duration::from_secs(10));

    for callers in [1usize, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(callers), &callers, |b, &callers| {
            b.to_async(&runtime).iter(|| async move {
                // Fresh facade so every iteration misses
                let cache = facade();
                let handles: Vec<_> = (0..callers)
                    .map(|_| {
                        let cache = cache.clone();
                        tokio::spawn(async move {
                            cache
                                .get_or_compute(
                                    "cold",
                                    None,
                                    || async {
                                        tokio::time::sleep(Duration::from_micros(200)).await;
                                        Ok::<_, anyhow::Error>("computed")
                                    },
                                    ComputeOptions::default(),
                                )
                                .await
                        })
                    })
                    .collect();

                for handle in handles {
                    handle
                        .await
                        .expect("caller task panicked")
                        .expect("compute failed");
                }
            })
        });
    }

    group.finish();
}

fn bench_uncached(c: &mut Criterion) {
    let runtime = setup_runtime();
    let cache = facade();

    c.bench_function("get_or_compute_uncached", |b| {
        b.to_async(&runtime).iter(|| async {
            cache
                .get_or_compute(
                    "bypass",
                    None,
                    || async { Ok::<_, anyhow::Error>("direct") },
                    ComputeOptions::uncached(),
                )
                .await
                .expect("uncached compute failed")
        })
    });
}

criterion_group!(benches, bench_hit_path, bench_coalesced_miss, bench_uncached);
criterion_main!(benches);
