use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use super::Middleware;
use crate::core::{Handler, Request, Response};
use crate::error::{WebError, internal_error};

/// Turns a panic in an inner handler into a 500.
#[derive(Clone, Default)]
pub struct PanicRecoveryMiddleware;

impl PanicRecoveryMiddleware {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for PanicRecoveryMiddleware {
    async fn handle(&self, req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        match AssertUnwindSafe(next.handle(req)).catch_unwind().await {
            Ok(result) => result,
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::error!(panic = %panic_msg, "panic caught in request handler");

                Err(internal_error("Internal Server Error"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Method;
    use http::StatusCode;

    struct PanicHandler;

    #[async_trait]
    impl Handler for PanicHandler {
        async fn handle(&self, _req: Request) -> Result<Response, WebError> {
            panic!("Test panic message");
        }
    }

    struct NormalHandler;

    #[async_trait]
    impl Handler for NormalHandler {
        async fn handle(&self, _req: Request) -> Result<Response, WebError> {
            Ok(Response::text(StatusCode::OK, "ok"))
        }
    }

    #[tokio::test]
    async fn test_panic_recovery() {
        let middleware = PanicRecoveryMiddleware::new();
        let req = Request::new(Method::GET, "/test");

        let err = middleware
            .handle(req, Arc::new(PanicHandler))
            .await
            .err()
            .expect("panic mapped to error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_normal_request_passes_through() {
        let middleware = PanicRecoveryMiddleware::new();
        let req = Request::new(Method::GET, "/test");

        let response = middleware.handle(req, Arc::new(NormalHandler)).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }
}
