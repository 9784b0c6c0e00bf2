pub mod uds;
pub use uds::UdsBgp;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::packet::{Family, Nlri, PathAttr};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("speaker unavailable: {0}")]
    Unavailable(String),
    #[error("speaker rpc failed: {0}")]
    Rpc(String),
    #[error("speaker connection closed")]
    Closed,
}

/// Opaque identifier the speaker assigns to an injected path. The only
/// operations are equality and handing it back to `delete_path`.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathHandle(Bytes);

impl PathHandle {
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self(raw.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathHandle({})", hex::encode(&self.0))
    }
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// A single path as delivered by the speaker's best-path event stream or
/// the RIB listing. `neighbor_ip` is empty (or the literal `"<nil>"`) for
/// locally originated paths, including paths this engine injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub family: Family,
    pub nlri: Nlri,
    #[serde(default)]
    pub pattrs: Vec<PathAttr>,
    #[serde(default)]
    pub is_withdraw: bool,
    #[serde(default)]
    pub neighbor_ip: String,
}

impl Path {
    pub fn is_local(&self) -> bool {
        self.neighbor_ip.is_empty() || self.neighbor_ip == "<nil>"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPathRequest {
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePathRequest {
    pub family: Family,
    pub handle: PathHandle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WatchEventFilter {
    pub best_path: bool,
    /// Replay the current RIB before streaming live events.
    pub init: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    pub paths: Vec<Path>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPathRequest {
    pub family: Family,
}

/// The narrow interface to the co-located BGP speaker.
#[async_trait]
pub trait BgpApi: Send + Sync {
    /// Inject a path, returning the speaker's opaque handle.
    async fn add_path(&self, req: AddPathRequest) -> Result<PathHandle, ApiError>;

    /// Withdraw a previously injected path by handle.
    async fn delete_path(&self, req: DeletePathRequest) -> Result<(), ApiError>;

    /// Subscribe to best-path events. Events are delivered through
    /// `events`; a full channel blocks the speaker-side publisher, which is
    /// the backpressure the event loop relies on.
    async fn watch_event(
        &self,
        filter: WatchEventFilter,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<(), ApiError>;

    /// One-shot enumeration of the current RIB for a family. The returned
    /// channel closes when the snapshot is exhausted.
    async fn list_path(&self, req: ListPathRequest) -> Result<mpsc::Receiver<Path>, ApiError>;
}
