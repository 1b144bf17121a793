use criterion::{criterion_group, criterion_main, Criterion};
use scope_lock::{LockMode, ScopeLockManager};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::RwLock;

const TASKS: usize = 4;
const OPS_PER_TASK: usize = 1000;

// Writers on four independent records: one coarse lock serializes them all,
// scoped locks on disjoint subtrees let them interleave.
fn bench_disjoint_writers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("disjoint_writers");

    group.bench_function("single_rwlock", |b| {
        b.to_async(&rt).iter(|| async {
            let store = Arc::new(RwLock::new([0u64; TASKS]));
            let mut handles = vec![];
            for record in 0..TASKS {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    for _ in 0..OPS_PER_TASK {
                        let mut guard = store.write().await;
                        guard[record] += 1;
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });

    group.bench_function("scope_lock_subtrees", |b| {
        b.to_async(&rt).iter(|| async {
            let manager = Arc::new(ScopeLockManager::new());
            let store: Arc<[AtomicU64; TASKS]> =
                Arc::new(std::array::from_fn(|_| AtomicU64::new(0)));
            let mut handles = vec![];
            for record in 0..TASKS {
                let manager = manager.clone();
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    let scope = ["records".to_string(), record.to_string()];
                    for _ in 0..OPS_PER_TASK {
                        manager
                            .run_exclusively(scope.clone(), LockMode::Exclusive, || {
                                let store = store.clone();
                                async move {
                                    store[record].fetch_add(1, Ordering::Relaxed);
                                }
                            })
                            .await;
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });

    group.finish();
}

// Everyone hammers the same scope: measures pure queue/drain overhead
// against a plain async RwLock doing the same serialization.
fn bench_single_scope(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("single_scope");

    group.bench_function("single_rwlock", |b| {
        b.to_async(&rt).iter(|| async {
            let store = Arc::new(RwLock::new(0u64));
            let mut handles = vec![];
            for _ in 0..TASKS {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    for _ in 0..OPS_PER_TASK {
                        *store.write().await += 1;
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });

    group.bench_function("scope_lock", |b| {
        b.to_async(&rt).iter(|| async {
            let manager = Arc::new(ScopeLockManager::new());
            let store = Arc::new(AtomicU64::new(0));
            let mut handles = vec![];
            for _ in 0..TASKS {
                let manager = manager.clone();
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    for _ in 0..OPS_PER_TASK {
                        manager
                            .run_exclusively(["counter"], LockMode::Exclusive, || {
                                let store = store.clone();
                                async move {
                                    store.fetch_add(1, Ordering::Relaxed);
                                }
                            })
                            .await;
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_disjoint_writers, bench_single_scope);
criterion_main!(benches);
