//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait so any library
//! (reqwest, ureq, a platform bridge) can perform the request.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based sync transport.
///
/// Locators must be absolute `http://` or `https://` URLs. Anything else
/// fails with a non-retryable "Invalid URL" error without reaching the
/// client.
pub struct HttpTransport<C: HttpClient> {
    client: C,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(client: C) -> Self {
        Self {
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }
}

impl<C: HttpClient> std::fmt::Debug for HttpTransport<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("last_error", &self.last_error())
            .finish_non_exhaustive()
    }
}

/// Returns true if `url` is an absolute http(s) URL with a host.
pub fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn fetch(&self, locator: &str) -> SyncResult<String> {
        if !self.is_connected() {
            return Err(SyncError::network_fatal("transport is not connected"));
        }
        if !is_http_url(locator) {
            let message = format!("Invalid URL: {locator}");
            self.set_error(&message);
            return Err(SyncError::network_fatal(message));
        }

        let body = match self.client.get(locator) {
            Ok(body) => body,
            Err(e) => {
                self.set_error(&e);
                tracing::debug!(url = locator, error = %e, "fetch failed");
                return Err(SyncError::network_retryable(format!("GET {locator}: {e}")));
            }
        };
        self.clear_error();

        String::from_utf8(body)
            .map_err(|e| SyncError::protocol(format!("response is not UTF-8: {e}")))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestClient {
        response: RwLock<Option<Vec<u8>>>,
        healthy: AtomicBool,
        hits: RwLock<Vec<String>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                healthy: AtomicBool::new(true),
                hits: RwLock::new(Vec::new()),
            }
        }

        fn set_response(&self, resp: Vec<u8>) {
            *self.response.write() = Some(resp);
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    impl HttpClient for TestClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, String> {
            self.hits.write().push(url.to_string());
            self.response
                .read()
                .clone()
                .ok_or_else(|| "connection refused".into())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn url_validation() {
        assert!(is_http_url("http://localhost:3/sync"));
        assert!(is_http_url("https://sync.example.com"));
        assert!(!is_http_url("http://"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("not a url"));
        assert!(!is_http_url("http://bad host/"));
    }

    #[test]
    fn invalid_url_is_fatal_and_skips_client() {
        let transport = HttpTransport::new(TestClient::new());
        let err = transport.fetch("noscheme").unwrap_err();
        assert!(err.to_string().contains("Invalid URL"));
        assert!(!err.is_retryable());
        assert!(transport.client().hits.read().is_empty());
        assert!(transport.last_error().is_some());
    }

    #[test]
    fn client_failure_is_retryable() {
        let transport = HttpTransport::new(TestClient::new());
        let err = transport.fetch("http://localhost:3/").unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn successful_fetch_returns_body() {
        let client = TestClient::new();
        client.set_response(b"{\"sequence\":1,\"documents\":[]}".to_vec());
        let transport = HttpTransport::new(client);
        let body = transport.fetch("https://sync.example.com/?sequence=0").unwrap();
        assert!(body.contains("sequence"));
        assert!(transport.last_error().is_none());
    }

    #[test]
    fn non_utf8_body_is_protocol_error() {
        let client = TestClient::new();
        client.set_response(vec![0xff, 0xfe]);
        let transport = HttpTransport::new(client);
        let err = transport.fetch("https://sync.example.com/").unwrap_err();
        assert!(matches!(err, SyncError::Protocol(_)));
    }

    #[test]
    fn disconnect_and_unhealthy() {
        let client = TestClient::new();
        client.set_healthy(false);
        let transport = HttpTransport::new(client);
        assert!(!transport.is_connected());

        let transport = HttpTransport::new(TestClient::new());
        transport.close().unwrap();
        assert!(!transport.is_connected());
        assert!(transport.fetch("https://sync.example.com/").is_err());
    }
}
