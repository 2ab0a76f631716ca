//! WebSocket JSON-RPC client for the DevTools protocol.
//!
//! Request/response correlation: each command gets a unique id and a
//! oneshot channel; a background receive task resolves the pending entry
//! when the matching frame arrives. Event frames are not subscribed to by
//! the driver (waits are polling-based) and are dropped after tracing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fanbridge_protocol::{CdpFrame, CdpRequest};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::{DriverError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// Budget for a single CDP command round-trip. Individual page operations
/// apply their own, tighter budgets on top.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Connected DevTools client bound to one browser process.
pub struct CdpClient {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Pending,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connects to the browser WebSocket endpoint and starts the receive
    /// loop.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| DriverError::Connection(format!("websocket handshake: {e}")))?;
        let (ws_sink, ws_source) = ws_stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(receive_loop(ws_source, Arc::clone(&pending)));

        debug!(target = "fanbridge.cdp", %ws_url, "cdp client connected");

        Ok(Self {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            recv_task,
        })
    }

    /// Sends a CDP command and awaits its response.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value> {
        // The receive loop drains pending entries when it exits; anything
        // registered after that would wait out the full call timeout.
        if self.recv_task.is_finished() {
            return Err(DriverError::Connection("cdp connection closed".into()));
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };

        let payload = serde_json::to_string(&request)?;
        trace!(target = "fanbridge.cdp", %method, id, "send");

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(err) = ws.send(Message::Text(payload.into())).await {
                self.pending.lock().remove(&id);
                return Err(err.into());
            }
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(DriverError::Connection("cdp connection closed".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(DriverError::Timeout {
                    ms: CALL_TIMEOUT.as_millis() as u64,
                    condition: format!("cdp response to {method}"),
                })
            }
        }
    }

    /// Creates a fresh page target and attaches a flattened session to it.
    /// Returns the session id subsequent page commands address.
    pub async fn attach_new_page(&self) -> Result<String> {
        let target = self
            .call(
                "Target.createTarget",
                Some(json!({"url": "about:blank"})),
                None,
            )
            .await?;
        let target_id = target["targetId"]
            .as_str()
            .ok_or_else(|| DriverError::Connection("createTarget returned no targetId".into()))?
            .to_string();

        let attached = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
                None,
            )
            .await?;
        attached["sessionId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Connection("attachToTarget returned no sessionId".into()))
    }

    /// Asks the browser process to shut down cleanly. Best-effort; the
    /// launcher's kill handles the unclean case.
    pub async fn close_browser(&self) -> Result<()> {
        self.call("Browser.close", None, None).await.map(|_| ())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

async fn receive_loop(mut ws_source: WsSource, pending: Pending) {
    while let Some(msg) = ws_source.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let frame: CdpFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(target = "fanbridge.cdp", error = %err, "unparseable cdp frame");
                        continue;
                    }
                };

                if let Some(id) = frame.id {
                    let Some(tx) = pending.lock().remove(&id) else {
                        continue;
                    };
                    let result = match frame.error {
                        Some(error) => Err(DriverError::Protocol {
                            code: error.code,
                            message: error.message,
                        }),
                        None => Ok(frame.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(result);
                } else if let Some(method) = frame.method {
                    trace!(target = "fanbridge.cdp", %method, "event (ignored)");
                }
            }
            Ok(Message::Close(_)) => {
                debug!(target = "fanbridge.cdp", "websocket closed");
                break;
            }
            Err(err) => {
                warn!(target = "fanbridge.cdp", error = %err, "websocket error");
                break;
            }
            _ => {}
        }
    }

    // Resolve anything still waiting so callers fail fast instead of
    // waiting out the call timeout.
    let stranded: Vec<_> = pending.lock().drain().collect();
    for (_, tx) in stranded {
        let _ = tx.send(Err(DriverError::Connection("cdp connection closed".into())));
    }
}
