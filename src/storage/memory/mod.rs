//! In-memory AppendLog implementation.
//!
//! Assigns Redis-style `<millis>-<seq>` ids and supports blocking tails,
//! so dashboards behave the same as against a real stream. Used for local
//! development (`storage.type: memory`) and throughout the test suite.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};

use crate::interfaces::{AppendLog, Cursor, Entry, EntryId, LogTail, NewEntry, Result, StorageError};

#[derive(Default)]
struct Inner {
    entries: RwLock<Vec<Entry>>,
    appended: Notify,
    fail_on_append: RwLock<bool>,
    fail_on_read: RwLock<bool>,
}

/// In-memory append-only log.
#[derive(Clone, Default)]
pub struct MemoryAppendLog {
    inner: Arc<Inner>,
}

impl MemoryAppendLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_append(&self, fail: bool) {
        *self.inner.fail_on_append.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.inner.fail_on_read.write().await = fail;
        // Parked tails re-check the flag.
        self.inner.appended.notify_waiters();
    }

    /// Snapshot of every entry, in log order.
    pub async fn entries(&self) -> Vec<Entry> {
        self.inner.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Next id after `last`, following the Redis stream rule: the clock part
/// never goes backwards and the sequence breaks ties.
fn next_id(last: Option<EntryId>, now: u64) -> EntryId {
    match last {
        Some(last) if now <= last.millis => EntryId::new(last.millis, last.seq + 1),
        _ => EntryId::new(now.max(1), 0),
    }
}

fn entries_after(entries: &[Entry], cursor: &Cursor, max_count: usize) -> Vec<Entry> {
    let start = match cursor {
        Cursor::Start => 0,
        Cursor::After(id) => entries.partition_point(|e| e.id <= *id),
    };
    entries[start..].iter().take(max_count).cloned().collect()
}

#[async_trait]
impl AppendLog for MemoryAppendLog {
    async fn append(&self, entry: NewEntry) -> Result<EntryId> {
        if *self.inner.fail_on_append.read().await {
            return Err(StorageError::Injected("append"));
        }

        let id = {
            let mut entries = self.inner.entries.write().await;
            let id = next_id(entries.last().map(|e| e.id), now_millis());
            entries.push(Entry {
                id,
                host: entry.host,
                message: entry.message,
            });
            id
        };

        self.inner.appended.notify_waiters();
        Ok(id)
    }

    async fn get(&self, id: EntryId) -> Result<Option<Entry>> {
        if *self.inner.fail_on_read.read().await {
            return Err(StorageError::Injected("read"));
        }
        let entries = self.inner.entries.read().await;
        Ok(entries
            .binary_search_by(|e| e.id.cmp(&id))
            .ok()
            .map(|i| entries[i].clone()))
    }

    async fn open_tail(&self) -> Result<Box<dyn LogTail>> {
        Ok(Box::new(MemoryTail {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemoryTail {
    inner: Arc<Inner>,
}

#[async_trait]
impl LogTail for MemoryTail {
    async fn read_after(&mut self, cursor: &Cursor, max_count: usize) -> Result<Vec<Entry>> {
        let max_count = max_count.max(1);
        loop {
            // Register before checking so an append between the check and
            // the await still wakes us.
            let notified = self.inner.appended.notified();

            if *self.inner.fail_on_read.read().await {
                return Err(StorageError::Injected("read"));
            }

            let batch = entries_after(&self.inner.entries.read().await, cursor, max_count);
            if !batch.is_empty() {
                return Ok(batch);
            }

            notified.await;
        }
    }
}
