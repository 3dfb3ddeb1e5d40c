//! Typed RPC surface over a [`Transport`].
//!
//! Methods are grouped by namespace the way the node exposes them:
//!
//! ```ignore
//! let api = Api::new(transport);
//! let token = api.signer().generate_authorization_token().await?;
//! let port = api.parity().dapps_port().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{Method, ParityMethod, SignerMethod};
use crate::transport::Transport;

// ============================================================================
// Api
// ============================================================================

/// RPC client composed over a shared transport.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("connected", &self.transport.is_connected())
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Creates a client over `transport`.
    #[inline]
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// `signer_*` methods.
    #[inline]
    #[must_use]
    pub fn signer(&self) -> Signer<'_> {
        Signer {
            transport: self.transport.as_ref(),
        }
    }

    /// `parity_*` methods.
    #[inline]
    #[must_use]
    pub fn parity(&self) -> Parity<'_> {
        Parity {
            transport: self.transport.as_ref(),
        }
    }
}

// ============================================================================
// Signer
// ============================================================================

/// `signer_*` namespace.
#[derive(Clone, Copy)]
pub struct Signer<'a> {
    transport: &'a dyn Transport,
}

impl Signer<'_> {
    /// Asks the node to mint a new authorization token.
    ///
    /// Only succeeds on a connection the node already trusts (for example
    /// one opened with the sentinel token on a fresh install).
    pub async fn generate_authorization_token(&self) -> Result<String> {
        call(self.transport, SignerMethod::GenerateAuthorizationToken.into()).await
    }
}

// ============================================================================
// Parity
// ============================================================================

/// `parity_*` namespace.
#[derive(Clone, Copy)]
pub struct Parity<'a> {
    transport: &'a dyn Transport,
}

impl Parity<'_> {
    /// Port of the dapps server.
    pub async fn dapps_port(&self) -> Result<u16> {
        call(self.transport, ParityMethod::DappsPort.into()).await
    }

    /// Interface the dapps server is bound to, if reported.
    pub async fn dapps_interface(&self) -> Result<Option<String>> {
        call(self.transport, ParityMethod::DappsInterface.into()).await
    }

    /// Port of the signer server.
    pub async fn signer_port(&self) -> Result<u16> {
        call(self.transport, ParityMethod::SignerPort.into()).await
    }
}

/// Executes `method` and decodes its result.
async fn call<T: DeserializeOwned>(transport: &dyn Transport, method: Method) -> Result<T> {
    let name = method.name();
    let value: Value = transport.execute(method).await?;

    serde_json::from_value(value)
        .map_err(|e| Error::protocol(format!("Unexpected result for {name}: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
