//! A content editor's entity store guarded by scoped locks.
//!
//! Three kinds of contenders:
//! - per-post "autosave" tasks, each exclusive on its own `postType/post/<id>`
//! - a "bulk migration" that periodically takes the whole `postType/post`
//!   subtree exclusive
//! - "list view" readers that take `postType/post` shared
//!
//! Autosaves of different posts interleave freely; the migration waits for
//! every reader and every autosave in the subtree, then blocks them all
//! while it runs.
//!
//! Run with: `cargo run --example editor_store`

use scope_lock::{LockMode, ScopeLockManager};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() {
    let manager = Arc::new(ScopeLockManager::new());
    let store: Arc<Mutex<HashMap<u64, u64>>> = Arc::new(Mutex::new(HashMap::new()));
    let migrations = Arc::new(AtomicUsize::new(0));
    let reads = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];

    // 4 autosave tasks, one post each.
    for post_id in 0..4u64 {
        let manager = manager.clone();
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let scope = ["postType".to_string(), "post".to_string(), post_id.to_string()];
            for _ in 0..200 {
                manager
                    .run_exclusively(scope.clone(), LockMode::Exclusive, || {
                        let store = store.clone();
                        async move {
                            *store.lock().unwrap().entry(post_id).or_insert(0) += 1;
                            tokio::task::yield_now().await;
                        }
                    })
                    .await;
            }
        }));
    }

    // 1 bulk migration task over the whole post subtree.
    {
        let manager = manager.clone();
        let store = store.clone();
        let migrations = migrations.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..10 {
                manager
                    .run_exclusively(["postType", "post"], LockMode::Exclusive, || {
                        let store = store.clone();
                        let migrations = migrations.clone();
                        async move {
                            // Sole owner of the subtree: safe to touch every post.
                            let snapshot: Vec<_> =
                                store.lock().unwrap().keys().copied().collect();
                            for id in snapshot {
                                *store.lock().unwrap().get_mut(&id).unwrap() += 0;
                            }
                            migrations.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .await;
                tokio::task::yield_now().await;
            }
        }));
    }

    // 3 list-view readers, shared on the subtree root.
    for _ in 0..3 {
        let manager = manager.clone();
        let store = store.clone();
        let reads = reads.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                manager
                    .run_exclusively(["postType", "post"], LockMode::Shared, || {
                        let store = store.clone();
                        let reads = reads.clone();
                        async move {
                            let _posts = store.lock().unwrap().len();
                            reads.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let store = store.lock().unwrap();
    println!("posts: {}", store.len());
    println!(
        "autosaves per post: {:?}",
        store.values().copied().collect::<Vec<_>>()
    );
    println!(
        "migrations: {}, list reads: {}",
        migrations.load(Ordering::SeqCst),
        reads.load(Ordering::SeqCst)
    );
    println!(
        "locks still held: {}, requests still queued: {}",
        manager.held_count(),
        manager.pending_count()
    );
}
