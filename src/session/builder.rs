//! Builder pattern for session configuration.
//!
//! Provides a fluent API for opening a WebSocket transport and starting a
//! [`SecureApi`] over it.
//!
//! # Example
//!
//! ```no_run
//! use secure_api::{FileStore, SecureApi};
//!
//! # async fn example() -> secure_api::Result<()> {
//! let api = SecureApi::builder()
//!     .endpoint("ws://127.0.0.1:8180")
//!     .hostname("127.0.0.1")
//!     .store(FileStore::new("/tmp/secure-api.json"))
//!     .connect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::{FileStore, TokenStore};
use crate::transport::WsTransport;
use crate::transport::connection::parse_endpoint;

use super::core::SecureApi;
use super::options::SessionOptions;

// ============================================================================
// SecureApiBuilder
// ============================================================================

/// Builder for configuring a [`SecureApi`] instance.
///
/// Use [`SecureApi::builder()`] to create a new builder.
#[derive(Default)]
pub struct SecureApiBuilder {
    /// Node signer endpoint.
    endpoint: Option<String>,
    /// Hostname override.
    hostname: Option<String>,
    /// Token store.
    store: Option<Arc<dyn TokenStore>>,
    /// Session options.
    options: SessionOptions,
}

impl fmt::Debug for SecureApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureApiBuilder")
            .field("endpoint", &self.endpoint)
            .field("hostname", &self.hostname)
            .field("store", &self.store.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// SecureApiBuilder Implementation
// ============================================================================

impl SecureApiBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node's signer endpoint (e.g., "ws://127.0.0.1:8180").
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the hostname the UI is served from.
    ///
    /// Defaults to the endpoint's host.
    #[inline]
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Sets the token store.
    ///
    /// Defaults to a [`FileStore`] in the user's config directory.
    #[inline]
    #[must_use]
    pub fn store(mut self, store: impl TokenStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Sets a shared token store.
    #[inline]
    #[must_use]
    pub fn shared_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the polling interval.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Sets all session options at once.
    ///
    /// A hostname set with [`hostname`](Self::hostname) still wins; a
    /// default hostname is replaced by the endpoint's host.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads the persisted token, opens the transport and starts polling.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or not a `ws://` or `wss://` URL
    /// - [`Error::Storage`] if no store was set and there is no config directory
    /// - any store error raised while reading the persisted token
    pub fn connect(self) -> Result<SecureApi> {
        let endpoint = self.endpoint.ok_or_else(|| {
            Error::config(
                "Endpoint is required. Use .endpoint() to set it.\n\
                 Example: SecureApi::builder().endpoint(\"ws://127.0.0.1:8180\")",
            )
        })?;
        let url = parse_endpoint(&endpoint)?;

        let store: Arc<dyn TokenStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FileStore::default_location()?),
        };

        let mut options = self.options;
        let hostname_unset = options.hostname == SessionOptions::default().hostname;
        if let Some(hostname) = self.hostname {
            options.hostname = hostname;
        } else if let Some(host) = url.host_str()
            && hostname_unset
        {
            options.hostname = host.to_string();
        }

        let persisted = store.get(&options.storage_key)?;
        debug!(
            endpoint = %url,
            has_token = persisted.is_some(),
            "Opening secure connection"
        );

        let transport = WsTransport::connect(&endpoint, persisted.clone().unwrap_or_default())?;
        let api = SecureApi::new(Arc::new(transport), store, options, persisted.as_deref());
        api.start();

        info!(endpoint = %url, state = %api.state(), "Secure session started");
        Ok(api)
    }
}

// ============================================================================
// Tests
// ============================================================================
