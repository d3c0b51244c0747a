//! Issues short, unique, human-friendly SKU codes over HTTP.
//!
//! A durable counter ([`store::CounterStore`]) hands out each integer at most
//! once, even across processes; [`sku::encode`] renders it as a 4-symbol code.
//! The HTTP surface is a small Pingora application ([`App`]) built by
//! [`routes::build_app`].

pub mod core;
pub mod error;
pub mod issuer;
pub mod middleware;
pub mod routes;
pub mod sku;
pub mod store;
pub mod utils;

pub use self::core::*;
pub use error::{ResponseError, WebError};
pub use http::StatusCode;
pub use issuer::{IssueError, Issued, Issuer};
pub use middleware::*;
pub use sku::{CodeError, Sku};
pub use store::{CounterStore, MemoryCounterStore, SqliteCounterStore, StoreConfig, StoreError};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::HeaderValue;
use pingora::protocols::http::ServerSession;
use pingora::server::ShutdownWatch;
use pingora::services::listening::Service;
use pingora_core::apps::{HttpPersistentSettings, HttpServerApp, HttpServerOptions, ReusedHttpStream};
use pingora_http::ResponseHeader;

/// Router, middleware stack and shared data.
pub struct App {
    router: Router,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) app_data: Arc<AppData>,
    max_body_size: usize,
}

struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn handle(&self, _req: Request) -> Result<Response, WebError> {
        Err(error::not_found("Not Found"))
    }
}

/// Answers a path routed only under other methods: 204 to OPTIONS, 405
/// otherwise. Both carry `Allow`.
struct AllowHandler {
    allow: String,
}

#[async_trait]
impl Handler for AllowHandler {
    async fn handle(&self, req: Request) -> Result<Response, WebError> {
        let mut res = if *req.method() == Method::OPTIONS {
            Response::empty(StatusCode::NO_CONTENT)
        } else {
            error::method_not_allowed("Method Not Allowed").into_response()
        };
        res.set_header(http::header::ALLOW, self.allow.clone());
        Ok(res)
    }
}

impl App {
    /// [`RequestId`] is always installed as the outermost middleware.
    pub fn new(router: Router) -> Self {
        let mut s = Self {
            router,
            middlewares: Vec::new(),
            app_data: Arc::new(AppData::new()),
            max_body_size: LimitsConfig::default().max_body_size,
        };
        s.use_middleware(RequestId::default());
        s
    }

    /// Middlewares run in registration order on the way in.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Stop reading a request body once it grows past `size` bytes. Match
    /// [`LimitsConfig::max_body_size`] so the limit check sees the overflow.
    pub fn set_max_body_size(&mut self, size: usize) {
        self.max_body_size = size;
    }

    pub fn set_app_share_data<T: Send + Sync + 'static>(&self, value: Arc<T>) -> Option<Arc<T>> {
        self.app_data.provide_arc(value)
    }

    /// Wrap the app in a Pingora listening service; add listeners with
    /// `add_tcp` before handing it to a server.
    pub fn to_service(self, name: &str) -> Service<App> {
        Service::new(name.to_string(), self)
    }

    /// Route `req` through the middleware stack to its handler.
    pub async fn handle(&self, req: Request) -> Response {
        let handler: Arc<dyn Handler> = match self.router.find(req.method(), req.path()) {
            Some(h) => h,
            None => {
                let mut allowed = self.router.allowed_methods(req.path());
                if *req.method() == Method::OPTIONS {
                    allowed.push(Method::OPTIONS.to_string());
                    allowed.sort();
                    allowed.dedup();
                }
                if allowed.is_empty() {
                    Arc::new(NotFoundHandler)
                } else {
                    Arc::new(AllowHandler {
                        allow: allowed.join(", "),
                    })
                }
            }
        };

        let req = req.with_app_data(Arc::clone(&self.app_data));
        let entry = compose(&self.middlewares, handler);
        let mut response = match entry.handle(req).await {
            Ok(res) => res,
            Err(err) => err.into_response(),
        };

        self.finalize_response_headers(&mut response);
        response
    }

    fn finalize_response_headers(&self, response: &mut Response) {
        if response.headers.contains_key(http::header::CONTENT_LENGTH) {
            return;
        }
        response.headers.insert(
            http::header::CONTENT_LENGTH,
            HeaderValue::from(response.body.len()),
        );
    }
}

/// Source of request body chunks; `None` marks the end of the body.
#[async_trait]
trait BodyReader: Send {
    async fn read_chunk(&mut self) -> pingora_core::Result<Option<Bytes>>;
}

#[async_trait]
impl BodyReader for ServerSession {
    async fn read_chunk(&mut self) -> pingora_core::Result<Option<Bytes>> {
        self.read_request_body().await
    }
}

/// Read the body until it ends or grows past `limit`. The flag reports
/// whether the whole body was read.
async fn read_body<R: BodyReader>(reader: &mut R, limit: usize) -> pingora_core::Result<(Bytes, bool)> {
    let mut body = BytesMut::new();
    while let Some(chunk) = reader.read_chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > limit {
            return Ok((body.freeze(), false));
        }
    }
    Ok((body.freeze(), true))
}

#[async_trait]
impl HttpServerApp for App {
    async fn process_new_http(
        self: &Arc<Self>,
        mut session: ServerSession,
        shutdown: &ShutdownWatch,
    ) -> Option<ReusedHttpStream> {
        if !(session.read_request().await.ok()?) {
            return None;
        }
        if *shutdown.borrow() {
            session.set_keepalive(None);
        } else {
            session.set_keepalive(Some(60));
        }

        let reqh = session.req_header();
        let path = String::from_utf8_lossy(reqh.raw_path()).to_string();
        let is_head = reqh.method == Method::HEAD;

        let mut req = Request::new(reqh.method.clone(), path);
        for (name, value) in reqh.headers.iter() {
            req.headers_mut().append(name.clone(), value.clone());
        }

        // Only read a body when the headers announce one.
        if !is_head {
            let has_te = req.headers().contains_key(http::header::TRANSFER_ENCODING);
            let has_len = req
                .headers()
                .get(http::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0)
                > 0;
            if has_te || has_len {
                let (body, complete) = read_body(&mut session, self.max_body_size).await.ok()?;
                if !complete {
                    // the rest of the body is left on the socket
                    session.set_keepalive(None);
                }
                req = req.with_body(body);
            }
        }

        let res = self.handle(req).await;

        let mut resp_header = ResponseHeader::build(res.status, Some(res.headers.len())).ok()?;
        for (name, value) in res.headers.iter() {
            resp_header.append_header(name.clone(), value.clone()).ok()?;
        }
        if session
            .write_response_header(Box::new(resp_header))
            .await
            .is_err()
        {
            return None;
        }

        // HEAD keeps the GET headers, including content-length, but no body.
        let body = if is_head { Bytes::new() } else { res.body };
        if session.write_response_body(body, true).await.is_err() {
            return None;
        }

        let persistent_settings = HttpPersistentSettings::for_session(&session);
        match session.finish().await {
            Ok(c) => c.map(|s| ReusedHttpStream::new(s, Some(persistent_settings))),
            Err(_) => None,
        }
    }

    fn h2_options(&self) -> Option<pingora::protocols::http::v2::server::H2Options> {
        None
    }

    fn server_options(&self) -> Option<&HttpServerOptions> {
        None
    }
}
