//! The service's HTTP surface.
//!
//! - `GET /`: landing page
//! - `POST /api/next`: issue a code, `{"sku": "999A"}`
//! - `GET /healthz`: liveness, never touches the counter store

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde::Serialize;

use crate::core::{Handler, Request, Response, RouteError, Router};
use crate::error::{WebError, internal_error};
use crate::issuer::Issuer;
use crate::middleware::{LimitsConfig, LimitsMiddleware, PanicRecoveryMiddleware, TracingMiddleware};
use crate::sku::Sku;
use crate::App;

pub const INDEX_PATH: &str = "/";
pub const ISSUE_PATH: &str = "/api/next";
pub const HEALTH_PATH: &str = "/healthz";

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Serialize)]
struct IssueResponse {
    sku: Sku,
}

struct IssueHandler;

impl IssueHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Handler for IssueHandler {
    async fn handle(&self, req: Request) -> Result<Response, WebError> {
        let issuer = req
            .get_app_share_data::<Issuer>()
            .ok_or_else(|| internal_error("issuer not configured"))?;

        let issued = issuer.issue_async().await?;
        tracing::info!(value = issued.value, sku = %issued.sku, "issued code");
        Ok(Response::json(StatusCode::OK, IssueResponse { sku: issued.sku }))
    }
}

struct IndexHandler;

impl IndexHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Handler for IndexHandler {
    async fn handle(&self, _req: Request) -> Result<Response, WebError> {
        Ok(Response::html(StatusCode::OK, INDEX_HTML))
    }
}

pub fn router() -> Result<Router, RouteError> {
    let mut router = Router::new();
    router.get(INDEX_PATH, IndexHandler::new())?;
    router.post(ISSUE_PATH, IssueHandler::new())?;
    router.get_fn(HEALTH_PATH, |_req| Ok(Response::text(StatusCode::OK, "ok")))?;
    Ok(router)
}

/// The complete service: routes, the shared [`Issuer`], and the middleware
/// stack (request id, tracing, panic recovery, limits, outermost first).
pub fn build_app(issuer: Issuer, limits: LimitsConfig) -> Result<App, RouteError> {
    let mut app = App::new(router()?);
    app.set_max_body_size(limits.max_body_size);
    app.set_app_share_data(Arc::new(issuer));
    app.use_middleware(TracingMiddleware::new());
    app.use_middleware(PanicRecoveryMiddleware::new());
    app.use_middleware(LimitsMiddleware::with_config(limits));
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Method;
    use crate::middleware::REQUEST_ID_HEADER;
    use crate::sku::{INITIAL_CURSOR, MAX_COUNT};
    use crate::store::{CounterStore, MemoryCounterStore, SqliteCounterStore, StoreConfig};
    use serde_json::Value;

    fn memory_app(config: StoreConfig) -> (App, Arc<MemoryCounterStore>) {
        let store = Arc::new(MemoryCounterStore::new(&config).unwrap());
        let issuer = Issuer::new(store.clone());
        (build_app(issuer, LimitsConfig::default()).unwrap(), store)
    }

    fn json_body(res: &Response) -> Value {
        serde_json::from_slice(&res.body).unwrap()
    }

    #[tokio::test]
    async fn issue_returns_sequential_codes() {
        let (app, _) = memory_app(StoreConfig::default());

        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(json_body(&res), serde_json::json!({"sku": "999A"}));

        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(json_body(&res)["sku"], "999C");
    }

    #[tokio::test]
    async fn issue_ignores_request_body() {
        let (app, _) = memory_app(StoreConfig::default());
        let req = Request::new(Method::POST, ISSUE_PATH).with_body(r#"{"ignored": true}"#);
        let res = app.handle(req).await;
        assert_eq!(json_body(&res)["sku"], "999A");
    }

    #[tokio::test]
    async fn exhaustion_is_a_client_error() {
        let (app, store) = memory_app(StoreConfig::new().initial_value(MAX_COUNT - 1));

        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(json_body(&res)["sku"], "ZZZZ");

        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(res.status, StatusCode::CONFLICT);
        assert!(json_body(&res)["error"].is_string());
        assert_eq!(store.cursor().unwrap(), MAX_COUNT);
    }

    #[tokio::test]
    async fn unreachable_store_is_a_server_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteCounterStore::new(
            dir.path().join("no-such-dir").join("skus.db"),
            StoreConfig::default(),
        );
        let app = build_app(Issuer::new(Arc::new(store)), LimitsConfig::default()).unwrap();

        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(
            json_body(&res)["error"]
                .as_str()
                .unwrap()
                .starts_with("counter store unavailable")
        );
    }

    #[tokio::test]
    async fn healthz_does_not_touch_store() {
        let (app, store) = memory_app(StoreConfig::default());
        let res = app.handle(Request::new(Method::GET, HEALTH_PATH)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_str(), Some("ok"));
        assert_eq!(store.cursor().unwrap(), INITIAL_CURSOR);
    }

    #[tokio::test]
    async fn issue_requires_post() {
        let (app, store) = memory_app(StoreConfig::default());
        let req = Request::new(Method::GET, ISSUE_PATH).header(REQUEST_ID_HEADER, "r-9");
        let res = app.handle(req).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            res.headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("r-9")
        );
        assert_eq!(
            res.headers.get(http::header::ALLOW).and_then(|v| v.to_str().ok()),
            Some("POST")
        );
        assert_eq!(store.cursor().unwrap(), INITIAL_CURSOR);
    }

    #[tokio::test]
    async fn index_serves_landing_page() {
        let (app, _) = memory_app(StoreConfig::default());
        let res = app.handle(Request::new(Method::GET, INDEX_PATH)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body_str().unwrap().contains(ISSUE_PATH));
    }

    #[tokio::test]
    async fn missing_issuer_is_internal_error() {
        let app = App::new(router().unwrap());
        let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn concurrent_requests_get_distinct_codes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteCounterStore::new(dir.path().join("skus.db"), StoreConfig::default());
        let issuer = Issuer::new(Arc::new(store));
        assert!(issuer.prepare());
        let app = Arc::new(build_app(issuer, LimitsConfig::default()).unwrap());

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let app = Arc::clone(&app);
                tokio::spawn(async move {
                    let res = app.handle(Request::new(Method::POST, ISSUE_PATH)).await;
                    assert_eq!(res.status, StatusCode::OK);
                    json_body(&res)["sku"].as_str().unwrap().to_string()
                })
            })
            .collect();

        let mut codes = std::collections::HashSet::new();
        for task in tasks {
            assert!(codes.insert(task.await.unwrap()));
        }
        assert_eq!(codes.len(), 32);
    }
}
