use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use super::Middleware;
use crate::core::{Handler, Request, Response};
use crate::error::{
    WebError, header_fields_too_large, payload_too_large, request_timeout, uri_too_long,
};

/// Timeout and size limits applied to every request.
///
/// The issue endpoint takes no body, so the body limit is small by default.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum time to produce a response (default: 30 seconds)
    pub request_timeout: Duration,
    /// Maximum request body size in bytes (default: 64KB)
    pub max_body_size: usize,
    /// Maximum URL path length (default: 2048 characters)
    pub max_path_length: usize,
    /// Maximum number of headers (default: 100)
    pub max_headers: usize,
    /// Maximum size of one header, name plus value (default: 8KB)
    pub max_header_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024,
            max_path_length: 2048,
            max_headers: 100,
            max_header_size: 8 * 1024,
        }
    }
}

impl LimitsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub fn max_path_length(mut self, length: usize) -> Self {
        self.max_path_length = length;
        self
    }

    pub fn max_headers(mut self, count: usize) -> Self {
        self.max_headers = count;
        self
    }

    pub fn max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }
}

#[derive(Default)]
pub struct LimitsMiddleware {
    config: LimitsConfig,
}

impl LimitsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LimitsConfig) -> Self {
        Self { config }
    }

    fn validate_request(&self, req: &Request) -> Result<(), WebError> {
        if req.path().len() > self.config.max_path_length {
            tracing::warn!(
                len = req.path().len(),
                max = self.config.max_path_length,
                "request path too long"
            );
            return Err(uri_too_long("URI Too Long"));
        }

        if req.headers().len() > self.config.max_headers {
            tracing::warn!(
                count = req.headers().len(),
                max = self.config.max_headers,
                "too many headers"
            );
            return Err(header_fields_too_large("Request Header Fields Too Large"));
        }

        if let Some((name, value)) = req
            .headers()
            .iter()
            .find(|(name, value)| name.as_str().len() + value.len() > self.config.max_header_size)
        {
            tracing::warn!(
                header = name.as_str(),
                len = name.as_str().len() + value.len(),
                max = self.config.max_header_size,
                "header too large"
            );
            return Err(header_fields_too_large("Request Header Fields Too Large"));
        }

        let declared = req
            .headers()
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if declared > self.config.max_body_size {
            tracing::warn!(
                len = declared,
                max = self.config.max_body_size,
                "declared request body too large"
            );
            return Err(payload_too_large("Payload Too Large"));
        }

        if req.body().len() > self.config.max_body_size {
            tracing::warn!(
                len = req.body().len(),
                max = self.config.max_body_size,
                "request body too large"
            );
            return Err(payload_too_large("Payload Too Large"));
        }

        Ok(())
    }
}

#[async_trait]
impl Middleware for LimitsMiddleware {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        self.validate_request(&req)?;

        // A timed-out issue may still complete on the blocking pool; its value
        // is then spent without being returned.
        match timeout(self.config.request_timeout, next.handle(req)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "request timed out"
                );
                Err(request_timeout("Request Timeout"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Method;
    use http::StatusCode;

    struct MockHandler {
        delay: Option<Duration>,
    }

    impl MockHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self { delay: None })
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self { delay: Some(delay) })
        }
    }

    #[async_trait]
    impl Handler for MockHandler {
        async fn handle(&self, _req: Request) -> Result<Response, WebError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Response::text(StatusCode::OK, "ok"))
        }
    }

    async fn status_for(config: LimitsConfig, handler: Arc<MockHandler>, req: Request) -> StatusCode {
        match LimitsMiddleware::with_config(config).handle(req, handler).await {
            Ok(res) => res.status,
            Err(err) => err.status_code(),
        }
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let config = LimitsConfig::new().request_timeout(Duration::from_millis(100));
        let handler = MockHandler::with_delay(Duration::from_millis(500));
        let status = status_for(config, handler, Request::new(Method::POST, "/api/next")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_path_length_limit() {
        let config = LimitsConfig::new().max_path_length(10);
        let req = Request::new(Method::GET, "/very-long-path-that-exceeds-limit");
        assert_eq!(status_for(config, MockHandler::new(), req).await, StatusCode::URI_TOO_LONG);
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let config = LimitsConfig::new().max_body_size(5);
        let req = Request::new(Method::POST, "/api/next").with_body(b"too long body".to_vec());
        assert_eq!(
            status_for(config, MockHandler::new(), req).await,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_declared_body_size_limit() {
        let config = LimitsConfig::new().max_body_size(1024);
        let req = Request::new(Method::POST, "/api/next")
            .header("content-length", "204800")
            .with_body(vec![b'x'; 512]);
        assert_eq!(
            status_for(config, MockHandler::new(), req).await,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_header_count_limit() {
        let config = LimitsConfig::new().max_headers(2);
        let req = Request::new(Method::GET, "/healthz")
            .header("header1", "value1")
            .header("header2", "value2")
            .header("header3", "value3");
        assert_eq!(
            status_for(config, MockHandler::new(), req).await,
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_header_size_limit() {
        let config = LimitsConfig::new().max_header_size(10);
        let req = Request::new(Method::GET, "/healthz").header("x-long", "very-long-value");
        assert_eq!(
            status_for(config, MockHandler::new(), req).await,
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_valid_request_passes() {
        let req = Request::new(Method::POST, "/api/next").with_body(b"small".to_vec());
        assert_eq!(
            status_for(LimitsConfig::new(), MockHandler::new(), req).await,
            StatusCode::OK
        );
    }
}
