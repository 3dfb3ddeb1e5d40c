//! Secure session module.
//!
//! This module provides the token-negotiating session and its configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SecureApi`] | Session state machine and accessors |
//! | [`SecureApiBuilder`] | Fluent configuration builder |
//! | [`SessionOptions`] | Polling and naming options |
//! | [`Session`] | Snapshot published on every change |
//! | [`ConnectState`] | Position in the negotiation |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for session configuration.
pub mod builder;

/// Session state machine.
pub mod core;

/// Session options.
pub mod options;

/// Session state and derived rules.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SecureApiBuilder;
pub use self::core::SecureApi;
pub use options::SessionOptions;
pub use state::{ConnectState, ConnectionMetadata, Session, resolve_dapps_url, sanitize_token};
