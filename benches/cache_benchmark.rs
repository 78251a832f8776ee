use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_booking_service::cache::{CacheStore, InMemoryCache};
use flight_booking_service::config::CacheConfig;
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::sync::Arc;
use std::time::Duration;

// Benchmark for the in-memory response cache under concurrent mixed load
pub fn cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("flight_response_cache");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .build()
        .expect("failed to build runtime");

    for max_items in [100usize, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(max_items),
            &max_items,
            |b, &max_items| {
                b.iter(|| {
                    let cache = Arc::new(InMemoryCache::new(CacheConfig {
                        default_ttl: Duration::from_secs(10),
                        max_items,
                    }));

                    // Trip keys drawn from a small pool so reads actually hit
                    let origins = ["JFK", "LAX", "DEL", "BOM", "LHR"];
                    let destinations = ["SFO", "ORD", "BLR", "MAA", "CDG"];
                    let payload = "x".repeat(1024);

                    rt.block_on(async {
                        let mut tasks = Vec::new();
                        for _ in 0..4 {
                            let cache = Arc::clone(&cache);
                            let payload = payload.clone();
                            tasks.push(tokio::spawn(async move {
                                for i in 0..250u32 {
                                    // ThreadRng is not Send, so keep it out
                                    // of scope across the awaits below.
                                    let (key, write) = {
                                        let mut rng = thread_rng();
                                        let origin = origins.choose(&mut rng).unwrap();
                                        let destination = destinations.choose(&mut rng).unwrap();
                                        let key = format!(
                                            "{}|{}|2024-06-{:02}|1",
                                            origin,
                                            destination,
                                            (i % 28) + 1
                                        );
                                        (key, rng.gen_bool(0.3))
                                    };

                                    if write {
                                        // 30% writes
                                        cache
                                            .set("flight", &key, payload.clone(), None)
                                            .await;
                                    } else {
                                        // 70% reads
                                        let _ = cache.get("flight", &key).await;
                                    }
                                }
                            }));
                        }

                        for task in tasks {
                            task.await.unwrap();
                        }
                    });

                    black_box(cache.stats())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, cache_benchmark);
criterion_main!(benches);
