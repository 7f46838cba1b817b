//! AppendLog interface tests.
//!
//! These tests verify the contract of the AppendLog trait.
//! Each storage implementation should run these tests.
//!
//! Stores may be shared between runs, so every assertion is relative to
//! ids returned by this run's own appends.

use std::time::Duration;

use bytes::Bytes;

use crier::interfaces::{AppendLog, Cursor, EntryId, NewEntry};

/// Create a test entry.
pub fn make_entry(host: &str, message: &[u8]) -> NewEntry {
    NewEntry {
        host: host.to_string(),
        message: Bytes::copy_from_slice(message),
    }
}

// =============================================================================
// AppendLog::append / get tests
// =============================================================================

pub async fn test_append_ids_increase<S: AppendLog + ?Sized>(store: &S) {
    let mut ids = Vec::new();
    for i in 0..10 {
        let id = store
            .append(make_entry("10.0.0.1", format!("msg {}", i).as_bytes()))
            .await
            .expect("append should succeed");
        ids.push(id);
    }
    assert!(
        ids.windows(2).all(|w| w[0] < w[1]),
        "ids should be strictly increasing: {:?}",
        ids
    );
}

pub async fn test_get_preserves_bytes<S: AppendLog + ?Sized>(store: &S) {
    let raw: &[u8] = b"line one\nline two\x00\xff";
    let id = store
        .append(make_entry("192.168.7.7", raw))
        .await
        .expect("append should succeed");

    let entry = store
        .get(id)
        .await
        .expect("get should succeed")
        .expect("entry should exist");
    assert_eq!(entry.id, id);
    assert_eq!(entry.host, "192.168.7.7");
    assert_eq!(entry.message.as_ref(), raw);
}

pub async fn test_get_unknown_id<S: AppendLog + ?Sized>(store: &S) {
    let id = store
        .append(make_entry("h", b"anchor"))
        .await
        .expect("append should succeed");

    let missing = EntryId::new(id.millis + 86_400_000, 0);
    let got = store.get(missing).await.expect("get should succeed");
    assert!(got.is_none(), "unknown id should be absent");
}

// =============================================================================
// LogTail tests
// =============================================================================

pub async fn test_tail_reads_strictly_after_cursor<S: AppendLog + ?Sized>(store: &S) {
    let first = store.append(make_entry("h", b"a")).await.unwrap();
    let second = store.append(make_entry("h", b"b")).await.unwrap();
    let third = store.append(make_entry("h", b"c")).await.unwrap();

    let mut tail = store.open_tail().await.expect("open_tail should succeed");

    let batch = tail
        .read_after(&Cursor::After(first), 10)
        .await
        .expect("read should succeed");
    let ids: Vec<EntryId> = batch.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![second, third]);
    assert_eq!(batch[0].message.as_ref(), b"b");
}

pub async fn test_tail_respects_max_count<S: AppendLog + ?Sized>(store: &S) {
    let start = store.append(make_entry("h", b"start")).await.unwrap();
    for i in 0..5 {
        store
            .append(make_entry("h", format!("{}", i).as_bytes()))
            .await
            .unwrap();
    }

    let mut tail = store.open_tail().await.unwrap();
    let batch = tail.read_after(&Cursor::After(start), 2).await.unwrap();
    assert_eq!(batch.len(), 2);

    let mut cursor = Cursor::After(start);
    cursor.advance(batch[1].id);
    let rest = tail.read_after(&cursor, 10).await.unwrap();
    assert_eq!(rest.len(), 3);
    assert!(rest[0].id > batch[1].id);
}

pub async fn test_tail_blocks_until_append<S: AppendLog + ?Sized>(store: &S) {
    let last = store.append(make_entry("h", b"before")).await.unwrap();
    let mut tail = store.open_tail().await.unwrap();
    let cursor = Cursor::After(last);

    let (batch, appended) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(5), tail.read_after(&cursor, 10)),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            store.append(make_entry("10.9.9.9", b"after")).await.unwrap()
        }
    );

    let batch = batch.expect("tail should wake on append").unwrap();
    assert_eq!(batch[0].id, appended);
    assert_eq!(batch[0].host, "10.9.9.9");
}

pub async fn test_parked_tail_does_not_stall_appends<S: AppendLog + ?Sized>(store: &S) {
    let last = store.append(make_entry("h", b"x")).await.unwrap();
    let mut parked = store.open_tail().await.unwrap();
    let cursor = Cursor::After(last);

    let (_, appended) = tokio::join!(
        tokio::time::timeout(Duration::from_millis(300), async {
            // Stays blocked until the append below lands, or times out.
            let _ = parked.read_after(&cursor, 1).await;
        }),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::time::timeout(Duration::from_secs(2), store.append(make_entry("h", b"y"))).await
        }
    );

    let id = appended
        .expect("append should not wait on a parked tail")
        .unwrap();
    assert!(id > last);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all AppendLog interface tests against a store implementation.
#[macro_export]
macro_rules! run_append_log_tests {
    ($store:expr) => {
        use $crate::storage::append_log_tests::*;

        test_append_ids_increase($store).await;
        println!("  test_append_ids_increase: PASSED");

        test_get_preserves_bytes($store).await;
        println!("  test_get_preserves_bytes: PASSED");

        test_get_unknown_id($store).await;
        println!("  test_get_unknown_id: PASSED");

        test_tail_reads_strictly_after_cursor($store).await;
        println!("  test_tail_reads_strictly_after_cursor: PASSED");

        test_tail_respects_max_count($store).await;
        println!("  test_tail_respects_max_count: PASSED");

        test_tail_blocks_until_append($store).await;
        println!("  test_tail_blocks_until_append: PASSED");

        test_parked_tail_does_not_stall_appends($store).await;
        println!("  test_parked_tail_does_not_stall_appends: PASSED");
    };
}
