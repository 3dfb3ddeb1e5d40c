//! In-process transport for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::Method;
use crate::transport::Transport;

/// Scripted transport.
///
/// Connectivity is flipped by the test. `update_token` behaves like the
/// WebSocket transport: it drops the connection and clears the last error.
#[derive(Default)]
pub(crate) struct MockTransport {
    connected: AtomicBool,
    last_error: Mutex<Option<Arc<Error>>>,
    token: Mutex<String>,
    token_updates: Mutex<Vec<String>>,
    replies: Mutex<FxHashMap<&'static str, std::result::Result<Value, String>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockTransport {
    pub(crate) fn new(token: &str) -> Self {
        let transport = Self::default();
        *transport.token.lock() = token.to_string();
        transport
    }

    /// Scripts the reply to `method`. `Err` becomes a node error object.
    pub(crate) fn respond(
        &self,
        method: impl Into<Method>,
        reply: std::result::Result<Value, &str>,
    ) {
        self.replies
            .lock()
            .insert(method.into().name(), reply.map_err(str::to_string));
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn set_error(&self, error: Error) {
        *self.last_error.lock() = Some(Arc::new(error));
    }

    /// Number of times `method` was executed.
    pub(crate) fn call_count(&self, method: impl Into<Method>) -> usize {
        let name = method.into().name();
        self.calls.lock().iter().filter(|call| **call == name).count()
    }

    /// Tokens passed to `update_token`, oldest first.
    pub(crate) fn token_updates(&self) -> Vec<String> {
        self.token_updates.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn last_error(&self) -> Option<Arc<Error>> {
        self.last_error.lock().clone()
    }

    fn token(&self) -> String {
        self.token.lock().clone()
    }

    fn update_token(&self, token: &str) {
        *self.token.lock() = token.to_string();
        self.token_updates.lock().push(token.to_string());
        self.connected.store(false, Ordering::SeqCst);
        *self.last_error.lock() = None;
    }

    async fn execute(&self, method: Method) -> Result<Value> {
        let name = method.name();
        self.calls.lock().push(name);

        match self.replies.lock().get(name) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(Error::rpc(-32000, message.clone())),
            None => Err(Error::rpc(-32601, "Method not found")),
        }
    }
}
