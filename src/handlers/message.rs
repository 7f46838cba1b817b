//! Full-message fetch by entry id.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{debug, error};

use super::AppContext;
use crate::interfaces::{AppendLog, EntryId, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid message id: {0}")]
    InvalidId(String),

    #[error("No message with id {0}")]
    NotFound(EntryId),

    #[error("Store error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchError::InvalidId(_) => StatusCode::BAD_REQUEST,
            FetchError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("{}\n", self)).into_response()
    }
}

/// Looks up the raw bytes of a single entry.
#[derive(Clone)]
pub struct MessageFetcher {
    log: Arc<dyn AppendLog>,
}

impl MessageFetcher {
    pub fn new(log: Arc<dyn AppendLog>) -> Self {
        Self { log }
    }

    pub async fn fetch(&self, id: &str) -> Result<Bytes, FetchError> {
        let id: EntryId = id
            .parse()
            .map_err(|_| FetchError::InvalidId(id.to_string()))?;

        match self.log.get(id).await {
            Ok(Some(entry)) => Ok(entry.message),
            Ok(None) => Err(FetchError::NotFound(id)),
            Err(e) => {
                error!(%id, error = %e, "Message fetch failed");
                Err(e.into())
            }
        }
    }
}

/// Handle GET /message/{id}
pub async fn handle_message(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Response, FetchError> {
    let message = MessageFetcher::new(Arc::clone(&ctx.log)).fetch(&id).await?;
    debug!(%id, bytes = message.len(), "Serving message");
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], message).into_response())
}
