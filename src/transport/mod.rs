//! Transport layer.
//!
//! This module defines the [`Transport`] port the session drives and the
//! WebSocket implementation that talks to the node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  SecureApi      │                              │  Node           │
//! │                 │         WebSocket            │  (signer port)  │
//! │  WsTransport    │─────────────────────────────►│                 │
//! │  → event loop   │   Sec-WebSocket-Protocol:    │  JSON-RPC       │
//! │                 │   <digest>_<timestamp>       │  server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `WsTransport::connect` - Spawn the connection task with a token
//! 2. Handshake succeeds: `is_connected` becomes `true`
//! 3. Handshake refused or socket lost: `last_error` is set, re-dial after 500ms
//! 4. `update_token` - Swap the token and re-dial immediately
//! 5. `shutdown` - Close the socket and stop the task
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `auth` | Token digest presented during the handshake |
//! | `connection` | WebSocket connection task and request correlation |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::Method;

// ============================================================================
// Submodules
// ============================================================================

/// Handshake token digest.
pub mod auth;

/// WebSocket connection and event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::WsTransport;

// ============================================================================
// Transport
// ============================================================================

/// Live connection to the node as seen by the session state machine.
///
/// Connectivity is observed by polling [`is_connected`](Self::is_connected)
/// and [`last_error`](Self::last_error); the transport never calls back
/// into the session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns `true` once the handshake with the current token succeeded.
    fn is_connected(&self) -> bool;

    /// Returns the error that ended the last connection attempt, if any.
    ///
    /// Cleared by a successful handshake and by [`update_token`](Self::update_token).
    fn last_error(&self) -> Option<Arc<Error>>;

    /// Returns the token presented to the node.
    fn token(&self) -> String;

    /// Replaces the token and reconnects with it.
    fn update_token(&self, token: &str);

    /// Executes an RPC method and returns its raw result.
    async fn execute(&self, method: Method) -> Result<Value>;

    /// Closes the connection for good.
    fn shutdown(&self) {}
}
