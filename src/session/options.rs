//! Session configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use secure_api::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_hostname("home.parity")
//!     .with_poll_interval(Duration::from_millis(100));
//! ```

use std::time::Duration;

use crate::store::TOKEN_KEY;

// ============================================================================
// Constants
// ============================================================================

/// Interval between state machine evaluations while connecting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Hostname assumed when none is configured.
const DEFAULT_HOSTNAME: &str = "127.0.0.1";

// ============================================================================
// SessionOptions
// ============================================================================

/// Tunables of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Delay between evaluations while connecting.
    pub poll_interval: Duration,

    /// Store key the token is saved under.
    pub storage_key: String,

    /// Hostname the UI is served from; used to build the dapps URL.
    pub hostname: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            storage_key: TOKEN_KEY.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }
}

impl SessionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the store key.
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Sets the hostname the UI is served from.
    #[inline]
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
