//! Token digest presented during the WebSocket handshake.
//!
//! The raw token never crosses the wire. The client sends
//! `Sec-WebSocket-Protocol: <hex(sha256("<token>:<time>"))>_<time>` where
//! `time` is the current unix time in seconds, and the node recomputes the
//! digest for each token it knows.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Builds the subprotocol value authenticating `token` at `time`.
#[must_use]
pub fn protocol_header(token: &str, time: u64) -> String {
    let digest = Sha256::digest(format!("{token}:{time}").as_bytes());
    format!("{}_{time}", hex::encode(digest))
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Checks a subprotocol value against a known token.
///
/// Used by nodes (and test fixtures) to accept a handshake.
#[must_use]
pub fn verify_protocol_header(header: &str, token: &str) -> bool {
    let Some((_, time)) = header.rsplit_once('_') else {
        return false;
    };

    match time.parse::<u64>() {
        Ok(time) => protocol_header(token, time) == header,
        Err(_) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
