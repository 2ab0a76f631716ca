//! Chrome DevTools Protocol envelopes.
//!
//! Only the subset the driver speaks: command requests, the combined
//! response/event frame, and the `/json/version` discovery payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A CDP command sent over the browser WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A frame received from the browser: either a response (`id` set) or an
/// event (`method` set).
#[derive(Debug, Clone, Deserialize)]
pub struct CdpFrame {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorPayload>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Error payload attached to a failed CDP response.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorPayload {
    pub code: i64,
    pub message: String,
}

/// `/json/version` response subset from the DevTools HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
    #[serde(rename = "Browser")]
    pub browser: Option<String>,
}
