use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error};

use super::{
    AddPathRequest, ApiError, BgpApi, DeletePathRequest, ListPathRequest, Path, PathHandle,
    WatchEvent, WatchEventFilter,
};

/// Client side of the speaker's line-delimited JSON control socket. One
/// persistent connection carries the request/response calls; `watch` and
/// `list-path` each stream over a dedicated connection.
pub struct UdsBgp {
    path: PathBuf,
    rpc: Mutex<RpcConn>,
    next_id: AtomicU64,
}

struct RpcConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RpcConn {
    fn new(stream: UnixStream) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct AddPathResult {
    handle: String,
}

#[derive(Deserialize)]
struct ListChunk {
    #[serde(default)]
    path: Option<Path>,
    #[serde(default)]
    end: bool,
}

fn rpc_err(err: impl ToString) -> ApiError {
    ApiError::Rpc(err.to_string())
}

impl UdsBgp {
    pub async fn connect(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let stream = UnixStream::connect(&path)
            .await
            .map_err(|e| ApiError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path,
            rpc: Mutex::new(RpcConn::new(stream)),
            next_id: AtomicU64::new(1),
        })
    }

    async fn dial(&self) -> Result<UnixStream, ApiError> {
        UnixStream::connect(&self.path)
            .await
            .map_err(|e| ApiError::Unavailable(format!("{}: {e}", self.path.display())))
    }

    async fn send_request(
        writer: &mut (impl AsyncWriteExt + Unpin),
        id: u64,
        method: &str,
        params: Value,
    ) -> Result<(), ApiError> {
        let mut line = serde_json::to_string(&Request { id, method, params }).map_err(rpc_err)?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| ApiError::Closed)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut conn = self.rpc.lock().await;
        Self::send_request(&mut conn.writer, id, method, params).await?;
        let mut line = String::new();
        let n = conn.reader.read_line(&mut line).await.map_err(|_| ApiError::Closed)?;
        if n == 0 {
            return Err(ApiError::Closed);
        }
        let resp: Response = serde_json::from_str(&line).map_err(rpc_err)?;
        if resp.id != id {
            return Err(rpc_err(format!("response id {} for request {id}", resp.id)));
        }
        if let Some(error) = resp.error {
            return Err(ApiError::Rpc(error));
        }
        Ok(resp.result)
    }
}

#[async_trait::async_trait]
impl BgpApi for UdsBgp {
    async fn add_path(&self, req: AddPathRequest) -> Result<PathHandle, ApiError> {
        let params = serde_json::to_value(&req).map_err(rpc_err)?;
        let result = self.call("add-path", params).await?;
        let result: AddPathResult = serde_json::from_value(result).map_err(rpc_err)?;
        let raw = hex::decode(&result.handle).map_err(rpc_err)?;
        Ok(PathHandle::new(raw))
    }

    async fn delete_path(&self, req: DeletePathRequest) -> Result<(), ApiError> {
        let params = serde_json::to_value(&req).map_err(rpc_err)?;
        self.call("delete-path", params).await?;
        Ok(())
    }

    async fn watch_event(
        &self,
        filter: WatchEventFilter,
        events: mpsc::Sender<WatchEvent>,
    ) -> Result<(), ApiError> {
        let stream = self.dial().await?;
        let (read, mut write) = stream.into_split();
        let params = serde_json::to_value(filter).map_err(rpc_err)?;
        Self::send_request(&mut write, 0, "watch", params).await?;
        tokio::spawn(async move {
            // Keep the write half alive for the lifetime of the stream so
            // the speaker does not see a half-closed socket.
            let _write = write;
            let mut reader = BufReader::new(read);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        debug!("watch stream closed by speaker");
                        break;
                    }
                    Ok(_) => match serde_json::from_str::<WatchEvent>(&line) {
                        Ok(event) => {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("watch stream decode: {e}"),
                    },
                    Err(e) => {
                        error!("watch stream read: {e}");
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    async fn list_path(&self, req: ListPathRequest) -> Result<mpsc::Receiver<Path>, ApiError> {
        let stream = self.dial().await?;
        let (read, mut write) = stream.into_split();
        let params = serde_json::to_value(&req).map_err(rpc_err)?;
        Self::send_request(&mut write, 0, "list-path", params).await?;
        // Buffer one destination at a time; the consumer drives the pace.
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let _write = write;
            let mut reader = BufReader::new(read);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ListChunk>(&line) {
                        Ok(chunk) => {
                            if chunk.end {
                                break;
                            }
                            if let Some(path) = chunk.path
                                && tx.send(path).await.is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            error!("list-path decode: {e}");
                            break;
                        }
                    },
                    Err(e) => {
                        error!("list-path read: {e}");
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }
}
