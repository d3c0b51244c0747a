use std::sync::Arc;

use http::HeaderValue;

use crate::{
    core::{Handler, Request, Response},
    error::WebError,
    middleware::Middleware,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ensures every request and response carries an `x-request-id`.
///
/// An incoming id is kept; otherwise one is generated. The header is copied
/// onto error responses too.
#[derive(Clone, Default)]
pub struct RequestId;

impl RequestId {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Middleware for RequestId {
    async fn handle(&self, mut req: Request, next: Arc<dyn Handler>) -> Result<Response, WebError> {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .filter(|v| !v.is_empty())
            .cloned()
            .or_else(|| HeaderValue::from_str(&crate::utils::request_id::generate()).ok());

        let Some(request_id) = request_id else {
            return next.handle(req).await;
        };
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, request_id.clone());

        let mut res = match next.handle(req).await {
            Ok(res) => res,
            Err(err) => err.into_response(),
        };
        if !res.headers.contains_key(REQUEST_ID_HEADER) {
            res.headers.insert(REQUEST_ID_HEADER, request_id);
        }
        Ok(res)
    }
}
