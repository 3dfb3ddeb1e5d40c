//! Secure API - authorization-token session for a node's signer WebSocket.
//!
//! This library negotiates and maintains the token a UI needs to talk to a
//! node over its signer WebSocket, and discovers where the node serves
//! dapps and signer confirmations.
//!
//! # Architecture
//!
//! - **Transport**: WebSocket connection presenting a token digest on
//!   handshake, re-dialing on failure
//! - **Session**: Polling state machine that moves from a stored (or
//!   sentinel) token to an authenticated connection, or gives up and asks
//!   for a token by hand
//! - **Store**: Where the negotiated token survives restarts
//!
//! # Quick Start
//!
//! ```no_run
//! use secure_api::{FileStore, Result, SecureApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let api = SecureApi::builder()
//!         .endpoint("ws://127.0.0.1:8180")
//!         .store(FileStore::default_location()?)
//!         .connect()?;
//!
//!     let mut status = api.subscribe();
//!     let _ = status.wait_for(|session| !session.is_connecting).await;
//!
//!     if api.needs_token() {
//!         println!("Paste a token generated by the node:");
//!     } else {
//!         println!("Connected, dapps at {}", api.dapps_url());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Typed RPC methods |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Request identifiers |
//! | [`protocol`] | JSON-RPC message types |
//! | [`session`] | [`SecureApi`] and its configuration |
//! | [`store`] | Token persistence |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Typed RPC methods over a transport.
pub mod api;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// JSON-RPC protocol message types.
pub mod protocol;

/// Token-negotiating session.
///
/// Use [`SecureApi::builder()`] to open a session.
pub mod session;

/// Token persistence.
pub mod store;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// RPC types
pub use api::Api;

// Error types
pub use error::{Error, Result};

// Session types
pub use session::{
    ConnectState, ConnectionMetadata, SecureApi, SecureApiBuilder, Session, SessionOptions,
};

// Store types
pub use store::{FileStore, MemoryStore, SENTINEL_TOKEN, TOKEN_KEY, TokenStore};

// Transport types
pub use transport::{Transport, WsTransport};
