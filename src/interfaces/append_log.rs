//! Append-only log interface.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid entry id: {0}")]
    InvalidId(String),

    #[error("Malformed entry {id}: {reason}")]
    Decode { id: String, reason: String },

    #[error("Injected failure: {0}")]
    Injected(&'static str),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Store-assigned entry identifier.
///
/// Ordered by `(millis, seq)`. Rendered as `<millis>-<seq>`, the format of
/// Redis stream ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId {
    pub millis: u64,
    pub seq: u64,
}

impl EntryId {
    pub const MIN: EntryId = EntryId { millis: 0, seq: 0 };

    pub fn new(millis: u64, seq: u64) -> Self {
        Self { millis, seq }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = StorageError;

    /// Parse `<millis>-<seq>`; a bare `<millis>` means sequence 0.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StorageError::InvalidId(s.to_string());
        let (millis, seq) = match s.split_once('-') {
            Some((millis, seq)) => (millis, seq),
            None => (s, "0"),
        };
        let millis = millis.parse::<u64>().map_err(|_| invalid())?;
        let seq = seq.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { millis, seq })
    }
}

/// Position of a live consumer in the log.
///
/// Reads return entries strictly after the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Logical beginning of the log.
    Start,
    /// The id of the last delivered entry.
    After(EntryId),
}

impl Cursor {
    /// Wire sentinels accepted for [`Cursor::Start`].
    pub const START_SENTINELS: [&'static str; 5] = ["", "0", "0-0", "start", "init"];

    /// Parse a cursor value sent by a dashboard client.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if Self::START_SENTINELS.contains(&value) {
            return Ok(Cursor::Start);
        }
        value.parse().map(Cursor::After)
    }

    /// The id reads start strictly after.
    pub fn after_id(&self) -> EntryId {
        match self {
            Cursor::Start => EntryId::MIN,
            Cursor::After(id) => *id,
        }
    }

    /// Advance to `id`. Cursors never move backwards.
    pub fn advance(&mut self, id: EntryId) {
        if id > self.after_id() || *self == Cursor::Start {
            *self = Cursor::After(id);
        }
    }
}

/// Fields of a record submitted for appending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Submitter network address, port stripped.
    pub host: String,
    /// Raw message bytes as submitted.
    pub message: Bytes,
}

/// A record read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub host: String,
    pub message: Bytes,
}

/// Interface for the durable ordered log.
///
/// Implementations:
/// - `RedisAppendLog`: Redis stream (XADD/XREAD/XRANGE)
/// - `MemoryAppendLog`: in-process log for development and tests
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Append one entry and return its store-assigned id.
    ///
    /// Ids are strictly increasing across calls.
    async fn append(&self, entry: NewEntry) -> Result<EntryId>;

    /// Fetch a single entry by id.
    async fn get(&self, id: EntryId) -> Result<Option<Entry>>;

    /// Open a dedicated tail handle for one live consumer.
    ///
    /// Blocking reads on the handle never stall appends or other tails.
    async fn open_tail(&self) -> Result<Box<dyn LogTail>>;
}

/// A per-consumer reader over the log.
#[async_trait]
pub trait LogTail: Send {
    /// Read up to `max_count` entries strictly after `cursor`, in log order.
    ///
    /// Blocks until at least one entry is available. Never returns an
    /// empty batch.
    async fn read_after(&mut self, cursor: &Cursor, max_count: usize) -> Result<Vec<Entry>>;
}
