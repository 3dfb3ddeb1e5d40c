//! Session state and the pure rules derived from it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::store::SENTINEL_TOKEN;

// ============================================================================
// Constants
// ============================================================================

/// Dapps port reported before metadata arrives.
pub const DEFAULT_DAPPS_PORT: u16 = 8080;

/// Signer port reported before metadata arrives.
pub const DEFAULT_SIGNER_PORT: u16 = 8180;

/// Hostname of the node's local gateway.
pub const GATEWAY_HOST: &str = "home.parity";

/// Hostname the gateway serves dapps under.
pub const DAPPS_GATEWAY_HOST: &str = "dapps.parity";

/// Interface meaning "bound to every address".
pub const WILDCARD_INTERFACE: &str = "0.0.0.0";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z0-9]").expect("static pattern"));

// ============================================================================
// ConnectState
// ============================================================================

/// Position of the session in the token negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectState {
    /// Connecting with a token that may or may not still be valid.
    #[default]
    Unauthenticated,
    /// Connecting with the sentinel token to ask the node for a real one.
    RequestingToken,
    /// Connecting with a token the node handed out.
    Authenticated,
    /// Negotiation gave up; a token must be supplied by hand.
    ManualRequired,
}

impl ConnectState {
    /// Initial state for a token read from the store.
    ///
    /// The sentinel starts a token request; anything else, including no
    /// token at all, is tried as-is first.
    #[inline]
    #[must_use]
    pub fn for_persisted_token(token: Option<&str>) -> Self {
        match token {
            Some(SENTINEL_TOKEN) => Self::RequestingToken,
            _ => Self::Unauthenticated,
        }
    }

    /// Returns `true` if polling can no longer leave this state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ManualRequired)
    }
}

impl fmt::Display for ConnectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::RequestingToken => "requesting-token",
            Self::Authenticated => "authenticated",
            Self::ManualRequired => "manual-required",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ConnectionMetadata
// ============================================================================

/// Server locations discovered once authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    /// Port of the dapps server.
    pub dapps_port: u16,
    /// Interface the dapps server is bound to.
    pub dapps_interface: Option<String>,
    /// Port of the signer server.
    pub signer_port: u16,
}

// ============================================================================
// Session
// ============================================================================

/// Snapshot of the negotiation, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Current state.
    pub state: ConnectState,
    /// `false` once the session settled on success or on manual entry.
    pub is_connecting: bool,
    /// Set as a whole once all three metadata queries succeed.
    pub metadata: Option<ConnectionMetadata>,
}

impl Session {
    /// Creates a session that has not settled yet.
    #[must_use]
    pub fn new(state: ConnectState) -> Self {
        Self {
            state,
            is_connecting: true,
            metadata: None,
        }
    }

    /// Returns `true` if a token must be supplied by hand.
    #[inline]
    #[must_use]
    pub fn needs_token(&self) -> bool {
        self.state == ConnectState::ManualRequired
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Strips everything but ASCII letters and digits.
#[must_use]
pub fn sanitize_token(token: &str) -> String {
    NON_ALPHANUMERIC.replace_all(token, "").into_owned()
}

/// Builds the dapps URL as seen from `current_hostname`.
///
/// The gateway host always maps to the dapps gateway. Otherwise the
/// reported interface is used unless it is missing or the wildcard, in
/// which case the current hostname is reused.
#[must_use]
pub fn resolve_dapps_url(current_hostname: &str, interface: Option<&str>, port: u16) -> String {
    let hostname = if current_hostname == GATEWAY_HOST {
        DAPPS_GATEWAY_HOST
    } else {
        match interface {
            None | Some("") | Some(WILDCARD_INTERFACE) => current_hostname,
            Some(interface) => interface,
        }
    };

    format!("http://{hostname}:{port}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_sentinel_starts_token_request() {
        assert_eq!(
            ConnectState::for_persisted_token(Some("initial")),
            ConnectState::RequestingToken
        );
        assert_eq!(
            ConnectState::for_persisted_token(None),
            ConnectState::Unauthenticated
        );
        assert_eq!(
            ConnectState::for_persisted_token(Some("")),
            ConnectState::Unauthenticated
        );
    }

    #[test]
    fn test_sanitize_token() {
        assert_eq!(sanitize_token("abc-123!"), "abc123");
        assert_eq!(sanitize_token("  Zx9 \n"), "Zx9");
        assert_eq!(sanitize_token("ünï-cödé"), "ncd");
        assert_eq!(sanitize_token(""), "");
    }

    #[test]
    fn test_only_manual_required_is_terminal() {
        assert!(ConnectState::ManualRequired.is_terminal());
        assert!(!ConnectState::Unauthenticated.is_terminal());
        assert!(!ConnectState::RequestingToken.is_terminal());
        assert!(!ConnectState::Authenticated.is_terminal());
    }

    #[test]
    fn test_new_session_is_connecting() {
        let session = Session::new(ConnectState::RequestingToken);
        assert!(session.is_connecting);
        assert!(!session.needs_token());
        assert!(session.metadata.is_none());
    }

    #[test]
    fn test_dapps_url_uses_reported_interface() {
        assert_eq!(
            resolve_dapps_url("127.0.0.1", Some("192.168.1.10"), 8080),
            "http://192.168.1.10:8080"
        );
    }

    #[test]
    fn test_dapps_url_wildcard_falls_back_to_hostname() {
        assert_eq!(
            resolve_dapps_url("node.local", Some("0.0.0.0"), 8080),
            "http://node.local:8080"
        );
        assert_eq!(
            resolve_dapps_url("node.local", None, 8081),
            "http://node.local:8081"
        );
    }

    #[test]
    fn test_dapps_url_gateway_alias() {
        assert_eq!(
            resolve_dapps_url("home.parity", Some("10.0.0.1"), 8080),
            "http://dapps.parity:8080"
        );
    }

    proptest! {
        #[test]
        fn prop_sanitized_token_is_alphanumeric(token in ".*") {
            let clean = sanitize_token(&token);
            prop_assert!(clean.chars().all(|c| c.is_ascii_alphanumeric()));
            prop_assert_eq!(sanitize_token(&clean), clean.clone());
        }

        #[test]
        fn prop_non_sentinel_tokens_start_unauthenticated(token in "[a-zA-Z0-9]{0,32}") {
            prop_assume!(token != SENTINEL_TOKEN);
            prop_assert_eq!(
                ConnectState::for_persisted_token(Some(token.as_str())),
                ConnectState::Unauthenticated
            );
        }

        #[test]
        fn prop_gateway_host_ignores_interface(
            interface in proptest::option::of("[0-9.]{1,15}"),
            port in any::<u16>(),
        ) {
            prop_assert_eq!(
                resolve_dapps_url(GATEWAY_HOST, interface.as_deref(), port),
                format!("http://dapps.parity:{port}")
            );
        }
    }
}
