//! Transport layer abstraction for sync operations.

use crate::batch::SyncBatch;
use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A sync transport resolves a locator into a raw batch payload.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, files, mock for testing, etc.).
pub trait SyncTransport: Send + Sync {
    /// Fetches the payload at `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] when the locator cannot be resolved
    /// or the fetch fails.
    fn fetch(&self, locator: &str) -> SyncResult<String>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool {
        true
    }

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()> {
        Ok(())
    }
}

impl<T: SyncTransport + ?Sized> SyncTransport for Box<T> {
    fn fetch(&self, locator: &str) -> SyncResult<String> {
        (**self).fetch(locator)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&self) -> SyncResult<()> {
        (**self).close()
    }
}

impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    fn fetch(&self, locator: &str) -> SyncResult<String> {
        (**self).fetch(locator)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&self) -> SyncResult<()> {
        (**self).close()
    }
}

#[derive(Debug)]
enum MockResponse {
    Payload(String),
    Failure { message: String, retryable: bool },
}

/// A mock transport for testing.
///
/// Responses are served in the order they were queued. Every requested
/// locator is recorded.
#[derive(Debug)]
pub struct MockTransport {
    connected: AtomicBool,
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Creates a new mock transport with no queued responses.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a raw payload.
    pub fn push_payload(&self, payload: impl Into<String>) {
        self.responses
            .lock()
            .push_back(MockResponse::Payload(payload.into()));
    }

    /// Queues a batch, serialized as JSON.
    pub fn push_batch(&self, batch: &SyncBatch) {
        self.push_payload(batch.to_json());
    }

    /// Queues a fetch failure.
    pub fn push_failure(&self, message: impl Into<String>, retryable: bool) {
        self.responses.lock().push_back(MockResponse::Failure {
            message: message.into(),
            retryable,
        });
    }

    /// Returns every locator fetched so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Returns the number of responses still queued.
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTransport for MockTransport {
    fn fetch(&self, locator: &str) -> SyncResult<String> {
        if !self.is_connected() {
            return Err(SyncError::network_fatal("transport closed"));
        }
        self.requests.lock().push(locator.to_string());
        match self.responses.lock().pop_front() {
            Some(MockResponse::Payload(payload)) => Ok(payload),
            Some(MockResponse::Failure { message, retryable }) => Err(SyncError::Network {
                message,
                retryable,
            }),
            None => Err(SyncError::network_fatal(format!(
                "no response queued for {locator}"
            ))),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_serves_in_order() {
        let transport = MockTransport::new();
        transport.push_payload("first");
        transport.push_failure("boom", true);

        assert_eq!(transport.fetch("a").unwrap(), "first");
        let err = transport.fetch("b").unwrap_err();
        assert!(err.is_retryable());
        assert!(transport.fetch("c").is_err());
        assert_eq!(transport.requests(), vec!["a", "b", "c"]);
    }

    #[test]
    fn mock_close() {
        let transport = MockTransport::new();
        transport.push_payload("x");
        assert!(transport.is_connected());
        transport.close().unwrap();
        assert!(!transport.is_connected());
        assert!(transport.fetch("a").is_err());
        assert_eq!(transport.remaining(), 1);
    }

    #[test]
    fn shared_transport_delegates() {
        let transport = Arc::new(MockTransport::new());
        transport.push_payload("x");
        let boxed: Box<dyn SyncTransport> = Box::new(Arc::clone(&transport));
        assert_eq!(boxed.fetch("loc").unwrap(), "x");
        assert_eq!(transport.requests(), vec!["loc"]);
    }
}
