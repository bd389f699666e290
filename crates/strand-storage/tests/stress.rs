//! Stress tests for strand-storage
//!
//! These tests drive both adapters through the `LogStore` trait with
//! concurrent writers and with removals interleaved between page fetches.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use strand_core::{AddedCounter, Created, LogStore, Meta, Order, Page, Query};
use strand_storage::{MemoryStore, RedbStore, RedbStoreConfig};
use tempfile::TempDir;

fn meta(created: i64) -> Meta {
    Meta::new(Created::from([created]))
}

async fn collect_all(store: &dyn LogStore<Value>, order: Order) -> Vec<Meta> {
    let mut metas = Vec::new();
    let mut page: Page<Value> = store.get(Query::ordered_by(order)).await.unwrap();
    loop {
        metas.extend(page.entries.into_iter().map(|(_, meta)| meta));
        match page.next {
            Some(next) => page = next.fetch().await.unwrap(),
            None => break,
        }
    }
    metas
}

async fn concurrent_writers(store: Arc<dyn LogStore<Value>>) {
    let counter = Arc::new(AddedCounter::new());
    let mut handles = Vec::new();

    // Eight writers over the same 0..400 range, each starting at a different offset
    for writer in 0..8i64 {
        let store = store.clone();
        let counter = counter.clone();
        handles.push(tokio::spawn(async move {
            let mut accepted = 0;
            for i in 0..400 {
                let created = (i + writer * 50) % 400;
                let result = store
                    .add(json!({ "type": "t", "writer": writer }), meta(created), &counter)
                    .await
                    .unwrap();
                if result.is_some() {
                    accepted += 1;
                }
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }
    assert_eq!(accepted, 400);
    assert_eq!(counter.last(), 400);

    let metas = collect_all(store.as_ref(), Order::Added).await;
    assert_eq!(metas.len(), 400);
    let added: HashSet<u64> = metas.iter().map(|m| m.added).collect();
    assert_eq!(added, (1..=400).collect());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_concurrent_writers() {
    concurrent_writers(Arc::new(MemoryStore::<Value>::with_page_size(32))).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_redb_store_concurrent_writers() {
    let temp_dir = TempDir::new().unwrap();
    let store = RedbStore::<Value>::open(RedbStoreConfig {
        db_path: temp_dir.path().join("stress.redb"),
        page_size: 32,
    })
    .unwrap();
    concurrent_writers(Arc::new(store)).await;
}

// ============================================================================
// Pagination under churn
// ============================================================================

/// Removing every other entry between page fetches never yields a removed
/// or repeated entry
#[tokio::test]
async fn test_removals_between_pages() {
    let store = MemoryStore::<Value>::with_page_size(10);
    let counter = AddedCounter::new();
    for c in 0..100 {
        store.add(json!({ "type": "t" }), meta(c), &counter).await.unwrap();
    }

    let mut seen = HashSet::new();
    let mut page = store.get(Query::default()).await.unwrap();
    loop {
        for (_, meta) in &page.entries {
            assert!(seen.insert(meta.created.clone()), "entry visited twice");
        }
        if let Some((_, last)) = page.entries.last() {
            let parts = last.created.parts();
            if let Some(strand_core::ClockPart::Int(n)) = parts.first() {
                for c in (0..*n).filter(|c| c % 2 == 1) {
                    store.remove(&Created::from([c])).await.unwrap();
                }
            }
        }
        match page.next {
            Some(next) => page = next.fetch().await.unwrap(),
            None => break,
        }
    }

    assert_eq!(seen.len(), 55);
    assert_eq!(store.len(), 55);
}

#[tokio::test]
async fn test_redb_bulk_insert_and_scan() {
    let temp_dir = TempDir::new().unwrap();
    let store = RedbStore::<Value>::open(RedbStoreConfig {
        db_path: temp_dir.path().join("bulk.redb"),
        page_size: 100,
    })
    .unwrap();
    let counter = AddedCounter::new();
    let count = 2_000;

    let start = Instant::now();
    for c in 0..count {
        store
            .add(json!({ "type": "t", "n": c }), meta(c), &counter)
            .await
            .unwrap();
    }
    println!("Inserted {} entries in {:?}", count, start.elapsed());

    let metas = collect_all(&store, Order::Created).await;
    assert_eq!(metas.len(), count as usize);
    assert!(metas.windows(2).all(|w| w[0].created > w[1].created));
}
