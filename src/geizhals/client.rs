//! HTTP fetching of product pages with classified failures.

use crate::error::{BoxError, FetchError};
use crate::geizhals::models::PriceReading;
use crate::geizhals::parser;
use crate::geizhals::site::TargetUrl;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Total time allowed for one request, including reading the body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("request failed: {0}")]
    Other(#[source] BoxError),
}

/// HTTP transport used by [`FetchClient`] - enables mocking for tests.
///
/// Implementations own connection reuse; one instance is shared by every
/// fetch of a process.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request and returns the status with the full body.
    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<TransportResponse, TransportError>;
}

/// `wreq` transport with browser TLS emulation.
pub struct WreqTransport {
    client: Client,
}

impl WreqTransport {
    /// Creates a transport with a total per-request `timeout`, optionally
    /// routed through `proxy`.
    pub fn new(proxy: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .connect_timeout(timeout.min(CONNECT_TIMEOUT));

        if let Some(proxy_url) = proxy {
            debug!("Configuring proxy: {}", proxy_url);
            builder = builder.proxy(wreq::Proxy::all(proxy_url)?);
        }

        Ok(Self { client: builder.build()? })
    }
}

fn classify_wreq(err: wreq::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        TransportError::Connect(Box::new(err))
    } else {
        // Builder, redirect and decode failures.
        TransportError::Other(Box::new(err))
    }
}

#[async_trait]
impl Transport for WreqTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<TransportResponse, TransportError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url).emulation(Emulation::Chrome131);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await.map_err(classify_wreq)?;
        let status = response.status().as_u16();
        debug!("Response status: {}", status);

        let body = response.text().await.map_err(classify_wreq)?;
        Ok(TransportResponse { status, body })
    }
}

/// Fetches product pages through an injected [`Transport`].
///
/// Exactly one request per call; retries are left to the caller's schedule.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl FetchClient {
    /// Creates a client using `transport` and the default 10 second timeout.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, timeout: DEFAULT_TIMEOUT }
    }

    /// Overrides the total request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches the raw markup of `target`.
    pub async fn fetch(&self, target: &TargetUrl) -> Result<String, FetchError> {
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language", target.site().accept_language().to_string()),
            ("Cache-Control", "no-cache".to_string()),
        ];

        let outcome =
            tokio::time::timeout(self.timeout, self.transport.get(target.as_str(), &headers))
                .await;

        let response = match outcome {
            Err(elapsed) => {
                warn!("Timed out after {:?} fetching {}", self.timeout, target);
                return Err(FetchError::communication(
                    format!("Timeout error fetching information after {:?}", self.timeout),
                    Some(Box::new(elapsed)),
                ));
            }
            Ok(Err(TransportError::Timeout)) => {
                return Err(FetchError::communication(
                    "Timeout error fetching information",
                    Some(Box::new(TransportError::Timeout)),
                ));
            }
            Ok(Err(err @ TransportError::Connect(_))) => {
                return Err(FetchError::communication(
                    format!("Error fetching information - {}", err),
                    Some(Box::new(err)),
                ));
            }
            Ok(Err(err @ TransportError::Other(_))) => {
                return Err(FetchError::generic(
                    format!("Unexpected error fetching information - {}", err),
                    Some(Box::new(err)),
                ));
            }
            Ok(Ok(response)) => response,
        };

        match response.status {
            401 | 403 => Err(FetchError::Authentication { status: response.status }),
            200..=299 => Ok(response.body),
            status => Err(FetchError::Communication {
                message: format!("Request failed with status: {}", status),
                status: Some(status),
                source: None,
            }),
        }
    }

    /// Fetches `target` and extracts its price reading.
    pub async fn fetch_reading(&self, target: &TargetUrl) -> Result<PriceReading, FetchError> {
        let html = self.fetch(target).await?;
        Ok(parser::extract(&html)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::geizhals::site::validate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Mock transport replaying a fixed outcome.
    struct MockTransport {
        outcome: Mutex<Option<Result<TransportResponse, TransportError>>>,
        delay: Duration,
        calls: AtomicUsize,
        last_url: Mutex<Option<String>>,
    }

    impl MockTransport {
        fn new(outcome: Result<TransportResponse, TransportError>) -> Self {
            Self {
                outcome: Mutex::new(Some(outcome)),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
            }
        }

        fn slow(delay: Duration) -> Self {
            Self { delay, ..Self::new(Ok(TransportResponse::new(200, "late"))) }
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(
            &self,
            url: &str,
            _headers: &[(&'static str, String)],
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock().unwrap() = Some(url.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.lock().unwrap().take().unwrap_or(Err(TransportError::Timeout))
        }
    }

    fn target() -> TargetUrl {
        validate("https://geizhals.at/widget-a1.html").unwrap()
    }

    fn client(transport: MockTransport) -> (FetchClient, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        (FetchClient::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let ok = TransportResponse::new(200, "<html>ok</html>");
        let (client, transport) = client(MockTransport::new(Ok(ok)));
        let body = client.fetch(&target()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.last_url.lock().unwrap().as_deref(), Some(target().as_str()));
    }

    #[tokio::test]
    async fn test_fetch_unauthorized() {
        for status in [401, 403] {
            let (client, _) = client(MockTransport::new(Ok(TransportResponse::new(status, ""))));
            let err = client.fetch(&target()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_fetch_other_status_is_communication() {
        for status in [404, 500, 503] {
            let response = TransportResponse::new(status, "oops");
            let (client, _) = client(MockTransport::new(Ok(response)));
            let err = client.fetch(&target()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Communication);
            assert_eq!(err.setup_code(), "connection");
            assert!(err.is_retryable());
            assert_eq!(err.status(), Some(status));
            assert!(err.to_string().contains(&status.to_string()));
        }
    }

    #[tokio::test]
    async fn test_fetch_transport_timeout() {
        let (client, _) = client(MockTransport::new(Err(TransportError::Timeout)));
        let err = client.fetch(&target()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Communication);
    }

    #[tokio::test]
    async fn test_fetch_total_timeout() {
        let (client, transport) = client(MockTransport::slow(Duration::from_secs(5)));
        let client = client.with_timeout(Duration::from_millis(20));
        let err = client.fetch(&target()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Communication);
        assert!(err.to_string().contains("Timeout"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_connect_failure() {
        let cause: BoxError = "dns lookup failed".into();
        let (client, _) = client(MockTransport::new(Err(TransportError::Connect(cause))));
        let err = client.fetch(&target()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Communication);
        assert!(err.chain().contains("dns lookup failed"));
    }

    #[tokio::test]
    async fn test_fetch_unexpected_failure() {
        let cause: BoxError = "bad request builder".into();
        let (client, _) = client(MockTransport::new(Err(TransportError::Other(cause))));
        let err = client.fetch(&target()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_fetch_reading_extraction_failure() {
        let empty = TransportResponse::new(200, "<html></html>");
        let (client, _) = client(MockTransport::new(Ok(empty)));
        let err = client.fetch_reading(&target()).await.unwrap_err();
        assert!(matches!(err, FetchError::Extraction(_)));
        assert_eq!(err.kind(), ErrorKind::Generic);
    }

    #[tokio::test]
    async fn test_fetch_reading_success() {
        let html = r#"<html><body>
            <h1 class="variant__header__headline">Widget | Geizhals</h1>
            <span id="pricerange-min">€ 100,00</span>
            <span id="pricerange-max">€ 120,00</span>
        </body></html>"#;
        let (client, _) = client(MockTransport::new(Ok(TransportResponse::new(200, html))));
        let reading = client.fetch_reading(&target()).await.unwrap();
        assert_eq!(reading, PriceReading::new(100.0, 120.0, "Widget"));
    }

    #[test]
    fn test_default_timeout() {
        let (client, _) = client(MockTransport::new(Err(TransportError::Timeout)));
        assert_eq!(client.timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_wreq_transport_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/widget-a1.html"))
            .and(query_param("hloc", "at"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Widget</html>"))
            .mount(&mock_server)
            .await;

        let transport = WreqTransport::new(None, DEFAULT_TIMEOUT).unwrap();
        let url = format!("{}/widget-a1.html?hloc=at", mock_server.uri());
        let response =
            transport.get(&url, &[("Accept-Language", "de-AT".to_string())]).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.body.contains("Widget"));
    }

    #[tokio::test]
    async fn test_wreq_transport_passes_status_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let transport = WreqTransport::new(None, DEFAULT_TIMEOUT).unwrap();
        let response = transport.get(&mock_server.uri(), &[]).await.unwrap();
        assert_eq!(response.status, 403);
    }

    #[tokio::test]
    async fn test_wreq_transport_honors_longer_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
            .mount(&mock_server)
            .await;

        let short = WreqTransport::new(None, Duration::from_millis(50)).unwrap();
        let err = short.get(&mock_server.uri(), &[]).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));

        let long = WreqTransport::new(None, Duration::from_secs(5)).unwrap();
        let response = long.get(&mock_server.uri(), &[]).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_wreq_transport_invalid_request_is_other() {
        let transport = WreqTransport::new(None, DEFAULT_TIMEOUT).unwrap();
        let err = transport.get("not a url", &[]).await.unwrap_err();
        assert!(matches!(err, TransportError::Other(_)));
    }

    #[tokio::test]
    async fn test_wreq_transport_connect_error() {
        let transport = WreqTransport::new(None, DEFAULT_TIMEOUT).unwrap();
        // Nothing listens on port 9 locally.
        let err = transport.get("http://127.0.0.1:9/", &[]).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_) | TransportError::Timeout));
    }
}
