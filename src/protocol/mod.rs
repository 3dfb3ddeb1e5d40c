//! JSON-RPC protocol message types.
//!
//! This module defines the message format spoken with the node's signer
//! WebSocket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Node | Method call |
//! | `Response` | Node → Local | Result or error object |
//!
//! # Method Naming
//!
//! Methods follow the `namespace_methodName` format:
//!
//! - `signer_generateAuthorizationToken`
//! - `parity_dappsPort`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `method` | Method definitions by namespace |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Method definitions organized by namespace.
pub mod method;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use method::{Method, ParityMethod, SignerMethod};
pub use request::{Request, Response, RpcErrorObject};
