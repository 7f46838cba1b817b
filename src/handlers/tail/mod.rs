//! Live-tail broadcaster.
//!
//! One broadcaster session per dashboard WebSocket:
//!
//! ```text
//! Connecting -> AwaitingCursor -> Streaming -> Closed
//! ```
//!
//! The first client frame must be a text cursor (an entry id, or a start
//! sentinel such as `0`). From then on every entry appended after the cursor
//! is pushed as a JSON text frame `{id, host, message_head}`, in log order.
//! Failures close only this connection.

pub mod head;

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

pub use head::message_head;

use super::AppContext;
use crate::interfaces::{AppendLog, Cursor, Entry, LogTail, StorageError};

/// Session states of a live-tail connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Connecting,
    AwaitingCursor,
    Streaming,
    Closed,
}

/// Why a live-tail session ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error("Initial frame was not text")]
    UnsupportedFrame,

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TailError {
    /// Close frame sent to the client for this failure. A broken socket
    /// gets none.
    fn close_frame(&self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            TailError::UnsupportedFrame => (close_code::UNSUPPORTED, "expected a text cursor frame"),
            TailError::InvalidCursor(_) => (close_code::POLICY, "invalid cursor"),
            TailError::Storage(_) | TailError::Encode(_) => (close_code::ERROR, "store read failed"),
            TailError::Socket(_) => return None,
        };
        Some(CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        })
    }
}

/// One pushed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TailFrame {
    pub id: String,
    pub host: String,
    pub message_head: String,
}

impl TailFrame {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id.to_string(),
            host: entry.host.clone(),
            message_head: message_head(&entry.message),
        }
    }
}

/// Tails the log from a client-supplied cursor and pushes formatted entries.
#[derive(Clone)]
pub struct LiveTailBroadcaster {
    log: Arc<dyn AppendLog>,
    batch_size: usize,
}

impl LiveTailBroadcaster {
    pub fn new(log: Arc<dyn AppendLog>, batch_size: usize) -> Self {
        Self {
            log,
            batch_size: batch_size.max(1),
        }
    }

    /// Run a session to completion.
    ///
    /// Returns the final cursor when the client disconnects. On failure a
    /// close frame is sent (best effort) and the error returned.
    pub async fn run<S, E>(&self, socket: S) -> Result<Cursor, TailError>
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + Unpin,
        E: Display + Send,
    {
        let (mut sink, mut stream) = socket.split();

        let result = self.session(&mut sink, &mut stream).await;

        if let Some(frame) = result.as_ref().err().and_then(TailError::close_frame) {
            let _ = sink.send(Message::Close(Some(frame))).await;
        }
        let _ = sink.close().await;
        debug!(state = ?TailState::Closed, "Live tail closed");

        result
    }

    async fn session<Tx, Rx, E>(&self, sink: &mut Tx, stream: &mut Rx) -> Result<Cursor, TailError>
    where
        Tx: Sink<Message, Error = E> + Send + Unpin,
        Rx: Stream<Item = Result<Message, E>> + Send + Unpin,
        E: Display + Send,
    {
        debug!(state = ?TailState::Connecting, "Opening tail");
        let mut tail = self.log.open_tail().await?;

        debug!(state = ?TailState::AwaitingCursor, "Waiting for cursor");
        let Some(mut cursor) = await_cursor(stream).await? else {
            return Ok(Cursor::Start);
        };

        info!(state = ?TailState::Streaming, cursor = ?cursor, "Live tail streaming");
        loop {
            let batch = {
                // One read per batch. It stays parked across inbound frames;
                // only a close or EOF abandons it.
                let read = read_batch(tail.as_mut(), &cursor, self.batch_size);
                tokio::pin!(read);
                loop {
                    tokio::select! {
                        batch = &mut read => break batch?,
                        inbound = stream.next() => match inbound {
                            None | Some(Ok(Message::Close(_))) => {
                                info!(cursor = ?cursor, "Live tail client disconnected");
                                return Ok(cursor);
                            }
                            Some(Err(e)) => return Err(TailError::Socket(e.to_string())),
                            Some(Ok(_)) => {}
                        },
                    }
                }
            };

            for entry in batch {
                cursor.advance(entry.id);
                let text = serde_json::to_string(&TailFrame::from_entry(&entry))?;
                sink.send(Message::Text(text.into()))
                    .await
                    .map_err(|e| TailError::Socket(e.to_string()))?;
            }
        }
    }
}

async fn read_batch(
    tail: &mut dyn LogTail,
    cursor: &Cursor,
    max_count: usize,
) -> Result<Vec<Entry>, StorageError> {
    tail.read_after(cursor, max_count).await
}

/// Wait for the first data frame and parse it as a cursor.
///
/// Returns `None` when the client goes away first.
async fn await_cursor<Rx, E>(stream: &mut Rx) -> Result<Option<Cursor>, TailError>
where
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        match stream.next().await {
            None | Some(Ok(Message::Close(_))) => return Ok(None),
            Some(Err(e)) => return Err(TailError::Socket(e.to_string())),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Text(text))) => {
                return Cursor::parse(text.as_str()).map(Some).map_err(|e| {
                    warn!(error = %e, "Rejected live tail cursor");
                    TailError::InvalidCursor(text.as_str().to_string())
                });
            }
            Some(Ok(Message::Binary(_))) => {
                warn!("Live tail opened with a binary frame");
                return Err(TailError::UnsupportedFrame);
            }
        }
    }
}

/// Handle GET /ws
pub async fn handle_ws(State(ctx): State<Arc<AppContext>>, ws: WebSocketUpgrade) -> Response {
    let broadcaster = LiveTailBroadcaster::new(Arc::clone(&ctx.log), ctx.tail.batch_size);
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = broadcaster.run(socket).await {
            warn!(error = %e, "Live tail terminated");
        }
    })
}
