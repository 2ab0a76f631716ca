//! Chromium backend over the Chrome DevTools Protocol.
//!
//! Process launch and endpoint discovery, the WebSocket JSON-RPC client,
//! and the [`PageDriver`](crate::page::PageDriver) implementation that the
//! session drives in production.

pub mod client;
pub mod launcher;
pub mod page;

pub use client::CdpClient;
pub use launcher::LaunchedBrowser;
pub use page::CdpPage;
