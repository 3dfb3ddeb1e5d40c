//! Secure session coordinator.
//!
//! [`SecureApi`] drives a [`Transport`] from "unauthenticated" to
//! "authenticated", persists the negotiated token and discovers where the
//! dapps and signer servers live.
//!
//! # State Machine
//!
//! | State | Connected | Transport error | Neither |
//! |-------|-----------|-----------------|---------|
//! | `Unauthenticated` | success | request a token | wait |
//! | `RequestingToken` | generate token → `Authenticated` | manual | wait |
//! | `Authenticated` | success | manual | wait |
//! | `ManualRequired` | - | - | - |
//!
//! A failed token generation also ends in `ManualRequired`. Only
//! [`SecureApi::update_token`] leaves it.
//!
//! # Example
//!
//! ```no_run
//! use secure_api::SecureApi;
//!
//! # async fn example() -> secure_api::Result<()> {
//! let api = SecureApi::builder()
//!     .endpoint("ws://127.0.0.1:8180")
//!     .connect()?;
//!
//! let mut status = api.subscribe();
//! status.wait_for(|session| !session.is_connecting).await.ok();
//!
//! if api.needs_token() {
//!     api.update_token("token-from-the-user");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api::Api;
use crate::error::Error;
use crate::store::{SENTINEL_TOKEN, TokenStore};
use crate::transport::Transport;

use super::builder::SecureApiBuilder;
use super::options::SessionOptions;
use super::state::{
    ConnectState, ConnectionMetadata, DEFAULT_DAPPS_PORT, DEFAULT_SIGNER_PORT, Session,
    resolve_dapps_url, sanitize_token,
};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the session.
pub(crate) struct SessionInner {
    /// RPC client over the injected transport.
    pub api: Api,

    /// Where the token is persisted.
    pub store: Arc<dyn TokenStore>,

    /// Session configuration.
    pub options: SessionOptions,

    /// Current snapshot, published to subscribers.
    pub session: watch::Sender<Session>,

    /// Requests an evaluation without waiting for the next tick.
    pub wake: Notify,

    /// Polling task spawned.
    pub started: AtomicBool,

    /// Polling task should stop.
    pub shutdown: AtomicBool,
}

/// What the polling task does after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Evaluate again right away.
    Immediate,
    /// Evaluate again after the poll interval.
    Tick,
    /// Wait for an external token update.
    Idle,
}

// ============================================================================
// SecureApi
// ============================================================================

/// Authorization-token session against a node.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SecureApi {
    /// Shared inner state.
    pub(crate) inner: Arc<SessionInner>,
}

// ============================================================================
// SecureApi - Display
// ============================================================================

impl fmt::Debug for SecureApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureApi")
            .field("state", &self.state())
            .field("is_connecting", &self.is_connecting())
            .field("is_connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SecureApi - Construction
// ============================================================================

impl SecureApi {
    /// Creates a configuration builder that opens a WebSocket transport.
    #[inline]
    #[must_use]
    pub fn builder() -> SecureApiBuilder {
        SecureApiBuilder::new()
    }

    /// Creates a session over an already opened transport.
    ///
    /// `persisted` is the token the transport was opened with, as read
    /// from `store`. The session does not poll until [`start`](Self::start)
    /// is called.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        options: SessionOptions,
        persisted: Option<&str>,
    ) -> Self {
        let state = ConnectState::for_persisted_token(persisted);
        let (session, _) = watch::channel(Session::new(state));

        debug!(%state, first_run = persisted == Some(SENTINEL_TOKEN), "Session created");

        Self {
            inner: Arc::new(SessionInner {
                api: Api::new(transport),
                store,
                options,
                session,
                wake: Notify::new(),
                started: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Spawns the polling task.
    ///
    /// Returns `None` if it is already running. Must be called within a
    /// Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return None;
        }

        Some(tokio::spawn(self.clone().run()))
    }

    /// Stops polling and closes the transport.
    ///
    /// In-flight metadata queries are abandoned.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
        self.inner.api.transport().shutdown();
        debug!("Session shut down");
    }
}

// ============================================================================
// SecureApi - Public API
// ============================================================================

impl SecureApi {
    /// Replaces the token and restarts negotiation from `Unauthenticated`.
    ///
    /// This is the recovery path out of `ManualRequired`.
    pub fn update_token(&self, token: &str) {
        self.update_token_with_state(token, ConnectState::Unauthenticated);
    }

    /// Replaces the token and continues negotiation from `state`.
    ///
    /// The token is stripped to ASCII letters and digits before reaching the
    /// transport. The state machine is re-evaluated immediately.
    pub fn update_token_with_state(&self, token: &str, state: ConnectState) {
        self.apply_token(token, state);
        self.inner.wake.notify_one();
    }

    /// Returns the RPC client.
    #[inline]
    #[must_use]
    pub fn api(&self) -> &Api {
        &self.inner.api
    }

    /// Subscribes to session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectState {
        self.inner.session.borrow().state
    }

    /// Returns `true` until the session settles.
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        self.inner.session.borrow().is_connecting
    }

    /// Returns `true` if the transport is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.api.transport().is_connected()
    }

    /// Returns `true` if a token must be supplied by hand.
    #[must_use]
    pub fn needs_token(&self) -> bool {
        self.inner.session.borrow().needs_token()
    }

    /// Returns the token the transport currently presents.
    #[must_use]
    pub fn secure_token(&self) -> String {
        self.inner.api.transport().token()
    }

    /// Returns the discovered metadata, if all of it arrived.
    #[must_use]
    pub fn connection_metadata(&self) -> Option<ConnectionMetadata> {
        self.inner.session.borrow().metadata.clone()
    }

    /// Port of the dapps server (8080 until discovered).
    #[must_use]
    pub fn dapps_port(&self) -> u16 {
        self.inner
            .session
            .borrow()
            .metadata
            .as_ref()
            .map_or(DEFAULT_DAPPS_PORT, |metadata| metadata.dapps_port)
    }

    /// Interface of the dapps server, if discovered.
    #[must_use]
    pub fn dapps_interface(&self) -> Option<String> {
        self.inner
            .session
            .borrow()
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.dapps_interface.clone())
    }

    /// Port of the signer server (8180 until discovered).
    #[must_use]
    pub fn signer_port(&self) -> u16 {
        self.inner
            .session
            .borrow()
            .metadata
            .as_ref()
            .map_or(DEFAULT_SIGNER_PORT, |metadata| metadata.signer_port)
    }

    /// URL of the dapps server as reachable from the configured hostname.
    #[must_use]
    pub fn dapps_url(&self) -> String {
        resolve_dapps_url(
            &self.inner.options.hostname,
            self.dapps_interface().as_deref(),
            self.dapps_port(),
        )
    }
}

// ============================================================================
// SecureApi - State Machine
// ============================================================================

impl SecureApi {
    /// Polling task: one evaluation at a time until shutdown.
    async fn run(self) {
        let interval = self.inner.options.poll_interval;
        debug!(?interval, "Session polling started");

        while !self.inner.shutdown.load(Ordering::SeqCst) {
            match self.step().await {
                Step::Immediate => {}

                Step::Tick => {
                    tokio::select! {
                        _ = sleep(interval) => {}
                        _ = self.inner.wake.notified() => {}
                    }
                }

                Step::Idle => self.inner.wake.notified().await,
            }
        }

        debug!("Session polling stopped");
    }

    /// Evaluates the state machine once.
    pub(crate) async fn step(&self) -> Step {
        let state = self.state();
        let transport = self.inner.api.transport();
        let connected = transport.is_connected();
        let last_error = transport.last_error();

        match state {
            ConnectState::ManualRequired => Step::Idle,

            ConnectState::Unauthenticated | ConnectState::Authenticated if connected => {
                self.connect_success();
                Step::Idle
            }

            ConnectState::Unauthenticated => match last_error {
                Some(error) => {
                    debug!(error = %error, "Stored token rejected, requesting a new one");
                    self.apply_token(SENTINEL_TOKEN, ConnectState::RequestingToken);
                    Step::Immediate
                }
                None => Step::Tick,
            },

            ConnectState::RequestingToken if connected => self.request_token().await,

            ConnectState::RequestingToken | ConnectState::Authenticated => match last_error {
                Some(error) => {
                    debug!(error = %error, %state, "Connection refused");
                    self.set_manual();
                    Step::Idle
                }
                None => Step::Tick,
            },
        }
    }

    /// Asks the node for a token over the sentinel connection.
    async fn request_token(&self) -> Step {
        match self.inner.api.signer().generate_authorization_token().await {
            Ok(token) => {
                debug!("Authorization token generated");
                self.apply_token(&token, ConnectState::Authenticated);
                Step::Immediate
            }
            Err(error) => {
                warn!(error = %Error::token_generation(error), "Token negotiation failed");
                self.set_manual();
                Step::Idle
            }
        }
    }

    /// Sanitizes and installs `token`, then moves to `state`.
    fn apply_token(&self, token: &str, state: ConnectState) {
        let token = sanitize_token(token);
        self.inner.api.transport().update_token(&token);

        self.inner.session.send_modify(|session| {
            session.state = state;
            session.is_connecting = true;
        });

        debug!(%state, "Token updated");
    }

    fn set_manual(&self) {
        self.inner.session.send_modify(|session| {
            session.state = ConnectState::ManualRequired;
            session.is_connecting = false;
        });

        info!("Manual token entry required");
    }

    /// Runs once per transition into an authenticated connection.
    fn connect_success(&self) {
        self.inner.session.send_modify(|session| {
            session.state = ConnectState::Authenticated;
            session.is_connecting = false;
        });

        self.persist_token();
        self.fetch_metadata();

        info!(state = %self.state(), "Secure connection established");
    }

    fn persist_token(&self) {
        let token = self.inner.api.transport().token();
        let key = &self.inner.options.storage_key;

        match self.inner.store.set(key, &token) {
            Ok(()) => debug!(key = %key, "Token persisted"),
            Err(error) => warn!(error = %error, key = %key, "Failed to persist token"),
        }
    }

    /// Queries the three metadata values concurrently; applies all or none.
    fn fetch_metadata(&self) {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let parity = inner.api.parity();

            let result = tokio::try_join!(
                parity.dapps_port(),
                parity.dapps_interface(),
                parity.signer_port()
            );

            match result {
                Ok((dapps_port, dapps_interface, signer_port)) => {
                    debug!(dapps_port, ?dapps_interface, signer_port, "Connection metadata received");

                    inner.session.send_modify(|session| {
                        session.metadata = Some(ConnectionMetadata {
                            dapps_port,
                            dapps_interface,
                            signer_port,
                        });
                    });
                }
                Err(error) => {
                    warn!(error = %Error::metadata_fetch(error), "Connection metadata left unchanged");
                }
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
