//! Redis stream AppendLog implementation.
//!
//! Entries live in a single stream (default key `crier`) with two fields,
//! `message` and `host`. Ids are assigned by Redis on XADD.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use bytes::Bytes;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::interfaces::{AppendLog, Cursor, Entry, EntryId, LogTail, NewEntry, Result, StorageError};
use crate::utils::retry::connection_backoff;

/// Stream field holding the raw message bytes.
pub const MESSAGE_FIELD: &str = "message";
/// Stream field holding the submitter address.
pub const HOST_FIELD: &str = "host";

/// Redis stream append log.
///
/// Appends and point reads share one connection behind a mutex, so appends
/// are serialized. Each tail gets its own connection because `XREAD BLOCK 0`
/// parks the connection until new entries arrive.
pub struct RedisAppendLog {
    client: Client,
    conn: Mutex<ConnectionManager>,
    stream_key: String,
}

impl RedisAppendLog {
    /// Connect to Redis, retrying with backoff, and verify with PING.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `stream_key` - Stream holding the entries (default: "crier")
    pub async fn new(url: &str, stream_key: Option<&str>) -> Result<Self> {
        let client = Client::open(url)?;

        let connect_client = client.clone();
        let mut conn = (|| {
            let c = connect_client.clone();
            async move { ConnectionManager::new(c).await }
        })
        .retry(connection_backoff())
        .notify(|err: &redis::RedisError, dur: Duration| {
            warn!(url = %url, error = %err, delay = ?dur, "Redis connection failed, retrying");
        })
        .await?;

        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!(url = %url, "Connected to Redis");

        Ok(Self {
            client,
            conn: Mutex::new(conn),
            stream_key: stream_key.unwrap_or("crier").to_string(),
        })
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }
}

/// Convert a Redis stream record into a typed entry.
///
/// Missing or non-binary fields are reported as [`StorageError::Decode`].
pub(crate) fn decode_entry(record: StreamId) -> Result<Entry> {
    let id: EntryId = record.id.parse()?;
    let mut fields = record.map;

    let message = take_field(&mut fields, MESSAGE_FIELD, &record.id)?;
    let host = take_field(&mut fields, HOST_FIELD, &record.id)?;
    let host = String::from_utf8(host).map_err(|_| StorageError::Decode {
        id: record.id.clone(),
        reason: "host is not valid UTF-8".to_string(),
    })?;

    Ok(Entry {
        id,
        host,
        message: Bytes::from(message),
    })
}

fn take_field(fields: &mut HashMap<String, Value>, name: &str, id: &str) -> Result<Vec<u8>> {
    let value = fields.remove(name).ok_or_else(|| StorageError::Decode {
        id: id.to_string(),
        reason: format!("missing field '{}'", name),
    })?;
    redis::from_redis_value(&value).map_err(|e| StorageError::Decode {
        id: id.to_string(),
        reason: format!("field '{}': {}", name, e),
    })
}

#[async_trait]
impl AppendLog for RedisAppendLog {
    async fn append(&self, entry: NewEntry) -> Result<EntryId> {
        let fields: [(&str, &[u8]); 2] = [
            (MESSAGE_FIELD, entry.message.as_ref()),
            (HOST_FIELD, entry.host.as_bytes()),
        ];

        let id: String = {
            let mut conn = self.conn.lock().await;
            conn.xadd(&self.stream_key, "*", &fields).await?
        };

        debug!(stream = %self.stream_key, id = %id, "Appended entry");
        id.parse()
    }

    async fn get(&self, id: EntryId) -> Result<Option<Entry>> {
        let id = id.to_string();
        let reply: StreamRangeReply = {
            let mut conn = self.conn.lock().await;
            conn.xrange_count(&self.stream_key, &id, &id, 1).await?
        };

        reply.ids.into_iter().next().map(decode_entry).transpose()
    }

    async fn open_tail(&self) -> Result<Box<dyn LogTail>> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(Box::new(RedisTail {
            conn,
            stream_key: self.stream_key.clone(),
        }))
    }
}

/// Dedicated tail over one Redis connection.
struct RedisTail {
    conn: MultiplexedConnection,
    stream_key: String,
}

#[async_trait]
impl LogTail for RedisTail {
    async fn read_after(&mut self, cursor: &Cursor, max_count: usize) -> Result<Vec<Entry>> {
        let after = cursor.after_id().to_string();
        let options = StreamReadOptions::default()
            .count(max_count.max(1))
            .block(0);

        loop {
            let reply: StreamReadReply = self
                .conn
                .xread_options(&[&self.stream_key], &[&after], &options)
                .await?;

            let entries = reply
                .keys
                .into_iter()
                .filter(|k| k.key == self.stream_key)
                .flat_map(|k| k.ids)
                .map(decode_entry)
                .collect::<Result<Vec<_>>>()?;

            if !entries.is_empty() {
                return Ok(entries);
            }
        }
    }
}
