//! Method definitions organized by namespace.
//!
//! Only the methods the session bootstrapper needs are modeled.
//!
//! | Namespace | Methods |
//! |-----------|---------|
//! | `signer` | Authorization token generation |
//! | `parity` | Dapps and signer server discovery |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Method Wrapper
// ============================================================================

/// All RPC methods organized by namespace.
///
/// This enum wraps namespace-specific method enums for unified serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Method {
    /// Signer namespace methods.
    Signer(SignerMethod),
    /// Parity namespace methods.
    Parity(ParityMethod),
}

impl Method {
    /// Returns the wire name of the method.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Signer(SignerMethod::GenerateAuthorizationToken) => {
                "signer_generateAuthorizationToken"
            }
            Self::Parity(ParityMethod::DappsPort) => "parity_dappsPort",
            Self::Parity(ParityMethod::DappsInterface) => "parity_dappsInterface",
            Self::Parity(ParityMethod::SignerPort) => "parity_signerPort",
        }
    }
}

impl From<SignerMethod> for Method {
    fn from(method: SignerMethod) -> Self {
        Self::Signer(method)
    }
}

impl From<ParityMethod> for Method {
    fn from(method: ParityMethod) -> Self {
        Self::Parity(method)
    }
}

// ============================================================================
// Signer Methods
// ============================================================================

/// Signer namespace methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "method")]
pub enum SignerMethod {
    /// Ask the node for a fresh authorization token.
    #[serde(rename = "signer_generateAuthorizationToken")]
    GenerateAuthorizationToken,
}

// ============================================================================
// Parity Methods
// ============================================================================

/// Parity namespace methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "method")]
pub enum ParityMethod {
    /// Port the dapps server listens on.
    #[serde(rename = "parity_dappsPort")]
    DappsPort,

    /// Interface the dapps server is bound to.
    #[serde(rename = "parity_dappsInterface")]
    DappsInterface,

    /// Port the signer server listens on.
    #[serde(rename = "parity_signerPort")]
    SignerPort,
}

// ============================================================================
// Tests
// ============================================================================
