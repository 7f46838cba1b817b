//! Secret-gated message ingestion.
//!
//! Every path is handled here: `/<secret>/<base32(message)>` appends one
//! entry, anything else is refused. Any method is accepted.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, Uri};
use axum::Router;
use bytes::Bytes;
use tracing::{debug, error};

use super::AppContext;
use crate::gate::{GateError, Secret, SecretGate};
use crate::interfaces::{AppendLog, EntryId, NewEntry, StorageError};

pub const SUCCESS_BODY: &str = "Success!\n";
pub const BAD_REQUEST_BODY: &str = "Failed to parse message as base32!\n";
pub const FORBIDDEN_BODY: &str = "Permission denied!\n";
pub const STORE_ERROR_BODY: &str = "Failed to write to database!\n";

/// Appends authorized messages to the log.
#[derive(Clone)]
pub struct Ingestor {
    log: Arc<dyn AppendLog>,
}

impl Ingestor {
    pub fn new(log: Arc<dyn AppendLog>) -> Self {
        Self { log }
    }

    /// Append `{message, host}`. Store failures are logged and the message
    /// is dropped; there is no retry.
    pub async fn ingest(&self, message: Bytes, peer_host: String) -> Result<EntryId, StorageError> {
        let len = message.len();
        match self
            .log
            .append(NewEntry {
                host: peer_host.clone(),
                message,
            })
            .await
        {
            Ok(id) => {
                debug!(%id, host = %peer_host, bytes = len, "Message ingested");
                Ok(id)
            }
            Err(e) => {
                error!(host = %peer_host, error = %e, "Append failed, message dropped");
                Err(e)
            }
        }
    }
}

/// State for the ingest router.
#[derive(Clone)]
pub struct IngestState {
    gate: SecretGate,
    ingestor: Ingestor,
}

impl IngestState {
    pub fn new(ctx: &AppContext, secret: &Secret) -> Self {
        Self {
            gate: SecretGate::new(secret),
            ingestor: Ingestor::new(Arc::clone(&ctx.log)),
        }
    }
}

/// Build the ingest router.
pub fn router(state: IngestState) -> Router {
    Router::new().fallback(handle_ingest).with_state(state)
}

/// Submitter address with the port stripped. IPv4 clients of a dual-stack
/// listener are reported in plain dotted form.
pub fn peer_host(addr: &SocketAddr) -> String {
    addr.ip().to_canonical().to_string()
}

async fn handle_ingest(
    State(state): State<IngestState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> (StatusCode, &'static str) {
    let message = match state.gate.authorize(uri.path()) {
        Ok(message) => message,
        Err(GateError::BadRequest) => {
            debug!(peer = %peer, "Rejected undecodable message");
            return (StatusCode::BAD_REQUEST, BAD_REQUEST_BODY);
        }
        Err(_) => return (StatusCode::FORBIDDEN, FORBIDDEN_BODY),
    };

    match state.ingestor.ingest(message, peer_host(&peer)).await {
        Ok(_) => (StatusCode::OK, SUCCESS_BODY),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, STORE_ERROR_BODY),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Method, Request};
    use data_encoding::BASE32;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::storage::MemoryAppendLog;

    const SECRET: &str = "t0psecret";

    fn app(log: &MemoryAppendLog) -> Router {
        let ctx = AppContext::new(Arc::new(log.clone()), &Config::for_test());
        let secret = Secret::parse(SECRET).unwrap();
        router(IngestState::new(&ctx, &secret))
            .layer(MockConnectInfo(SocketAddr::from(([192, 168, 1, 20], 54321))))
    }

    async fn send(app: Router, method: Method, path: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_message_is_appended() {
        let log = MemoryAppendLog::new();
        let path = format!("/{}/{}", SECRET, BASE32.encode(b"backup finished"));

        let (status, body) = send(app(&log), Method::GET, &path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SUCCESS_BODY);

        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message.as_ref(), b"backup finished");
        assert_eq!(entries[0].host, "192.168.1.20");
    }

    #[tokio::test]
    async fn test_post_is_accepted() {
        let log = MemoryAppendLog::new();
        let path = format!("/{}/{}", SECRET, BASE32.encode(b"line1\nline2"));

        let (status, _) = send(app(&log), Method::POST, &path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log.entries().await[0].message.as_ref(), b"line1\nline2");
    }

    #[tokio::test]
    async fn test_wrong_secret_is_forbidden() {
        let log = MemoryAppendLog::new();
        let encoded = BASE32.encode(b"hi");

        for path in [
            format!("/wrongsecret/{}", encoded),
            format!("/{}", SECRET),
            "/".to_string(),
            format!("/x/{}/{}", SECRET, encoded),
        ] {
            let (status, body) = send(app(&log), Method::GET, &path).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "path {}", path);
            assert_eq!(body, FORBIDDEN_BODY);
        }
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn test_bad_base32_is_rejected() {
        let log = MemoryAppendLog::new();

        for suffix in ["", "not-base32", "NBUQ"] {
            let path = format!("/{}/{}", SECRET, suffix);
            let (status, body) = send(app(&log), Method::GET, &path).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "suffix {:?}", suffix);
            assert_eq!(body, BAD_REQUEST_BODY);
        }
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_returns_500() {
        let log = MemoryAppendLog::new();
        log.set_fail_on_append(true).await;
        let path = format!("/{}/{}", SECRET, BASE32.encode(b"lost"));

        let (status, body) = send(app(&log), Method::GET, &path).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, STORE_ERROR_BODY);
        assert!(log.is_empty().await);
    }

    #[test]
    fn test_peer_host_strips_port() {
        let v4 = SocketAddr::from(([10, 0, 0, 7], 8080));
        assert_eq!(peer_host(&v4), "10.0.0.7");

        let v6 = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443);
        assert_eq!(peer_host(&v6), "::1");
    }

    #[test]
    fn test_peer_host_unmaps_dual_stack_ipv4() {
        let mapped = Ipv4Addr::new(192, 168, 1, 20).to_ipv6_mapped();
        let addr = SocketAddr::new(IpAddr::V6(mapped), 50000);
        assert_eq!(peer_host(&addr), "192.168.1.20");
    }

    #[tokio::test]
    async fn test_dual_stack_client_host_is_stored_as_ipv4() {
        let log = MemoryAppendLog::new();
        let ctx = AppContext::new(Arc::new(log.clone()), &Config::for_test());
        let secret = Secret::parse(SECRET).unwrap();
        let peer = SocketAddr::new(
            IpAddr::V6(Ipv4Addr::new(10, 1, 2, 3).to_ipv6_mapped()),
            40000,
        );
        let app = router(IngestState::new(&ctx, &secret)).layer(MockConnectInfo(peer));

        let path = format!("/{}/{}", SECRET, BASE32.encode(b"from v4"));
        let (status, _) = send(app, Method::GET, &path).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(log.entries().await[0].host, "10.1.2.3");
    }
}
