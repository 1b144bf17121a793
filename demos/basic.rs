//! Smallest possible tour of the scoped lock manager.
//!
//! Run with: `cargo run --example basic`

use scope_lock::{LockMode, ScopeLockManager};

#[tokio::main]
async fn main() {
    let manager = ScopeLockManager::new();

    // Exclusive on a subtree blocks ancestors, the node itself, and
    // everything underneath.
    let page_lock = manager
        .acquire(["postType", "page"], LockMode::Exclusive)
        .await;
    println!(
        "holding exclusive on {}: page 42 available? {}",
        page_lock.path(),
        manager.is_available(["postType", "page", "42"], LockMode::Shared)
    );
    manager.release(&page_lock).unwrap();

    // Shared locks coexist; a writer waits for all of them.
    let reader_a = manager.acquire(["config"], LockMode::Shared).await;
    let reader_b = manager.acquire(["config"], LockMode::Shared).await;
    println!(
        "two readers on {}: writer available? {}",
        reader_a.path(),
        manager.is_available(["config"], LockMode::Exclusive)
    );
    manager.release(&reader_a).unwrap();
    manager.release(&reader_b).unwrap();

    // run_exclusively: acquire, run, release — exactly once, even on error.
    let outcome: Result<&str, &str> = manager
        .run_exclusively(["postType", "page", "42"], LockMode::Exclusive, || async {
            Ok("saved")
        })
        .await;
    println!("save outcome: {outcome:?}, locks held: {}", manager.held_count());
}
