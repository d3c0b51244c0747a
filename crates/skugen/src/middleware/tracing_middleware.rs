use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, info};

use crate::{
    core::{Handler, Request, Response},
    error::WebError,
    middleware::{Middleware, REQUEST_ID_HEADER},
};

/// Runs each request inside an `info` span carrying its request id, method
/// and path, and records status and latency when it completes.
#[derive(Clone, Default)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let span = tracing::info_span!(
            "request",
            request_id = request_id.as_str(),
            method = req.method().as_str(),
            path = req.path(),
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        );
        let span_for_record = span.clone();

        async move {
            let start_time = std::time::Instant::now();

            // render errors here so the span sees the final status
            let res = match next.handle(req).await {
                Ok(res) => res,
                Err(err) => err.into_response(),
            };

            span_for_record.record("status", res.status.as_u16());
            span_for_record.record("latency_ms", start_time.elapsed().as_millis() as u64);
            info!("request completed");

            Ok(res)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Method;
    use crate::error::internal_error;
    use http::StatusCode;

    struct Failing;

    #[async_trait]
    impl Handler for Failing {
        async fn handle(&self, _req: Request) -> Result<Response, WebError> {
            Err(internal_error("store exploded"))
        }
    }

    #[tokio::test]
    async fn errors_become_responses_inside_span() {
        let res = TracingMiddleware::new()
            .handle(Request::new(Method::POST, "/api/next"), Arc::new(Failing))
            .await
            .unwrap();
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body_str(), Some(r#"{"error":"store exploded"}"#));
    }
}
