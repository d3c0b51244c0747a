use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{Method, Request, Response};
use crate::error::WebError;

pub type RouteError = matchit::InsertError;

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: Request) -> Result<Response, WebError>;
}

/// Adapts a synchronous closure into a [`Handler`].
pub struct ResultClosure<F>
where
    F: Fn(Request) -> Result<Response, WebError> + Send + Sync + 'static,
{
    closure: F,
}

impl<F> ResultClosure<F>
where
    F: Fn(Request) -> Result<Response, WebError> + Send + Sync + 'static,
{
    pub fn new(closure: F) -> Self {
        Self { closure }
    }
}

#[async_trait]
impl<F> Handler for ResultClosure<F>
where
    F: Fn(Request) -> Result<Response, WebError> + Send + Sync + 'static,
{
    async fn handle(&self, req: Request) -> Result<Response, WebError> {
        (self.closure)(req)
    }
}

#[derive(Default)]
pub struct Router {
    by_method: HashMap<Method, matchit::Router<Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: Into<String>>(
        &mut self,
        method: Method,
        path: S,
        handler: Arc<dyn Handler>,
    ) -> Result<(), RouteError> {
        self.by_method
            .entry(method)
            .or_default()
            .insert(path, handler)
    }

    pub fn get<S: Into<String>>(&mut self, path: S, handler: Arc<dyn Handler>) -> Result<(), RouteError> {
        self.add(Method::GET, path, handler)
    }

    pub fn get_fn<S, F>(&mut self, path: S, handler: F) -> Result<(), RouteError>
    where
        S: Into<String>,
        F: Fn(Request) -> Result<Response, WebError> + Send + Sync + 'static,
    {
        self.add(Method::GET, path, Arc::new(ResultClosure::new(handler)))
    }

    pub fn post<S: Into<String>>(&mut self, path: S, handler: Arc<dyn Handler>) -> Result<(), RouteError> {
        self.add(Method::POST, path, handler)
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<Arc<dyn Handler>> {
        if let Some(r) = self.by_method.get(method)
            && let Ok(m) = r.at(path)
        {
            return Some(Arc::clone(m.value));
        }

        // HEAD falls back to GET; the body is dropped when the response is written
        if *method == Method::HEAD
            && let Some(rget) = self.by_method.get(&Method::GET)
            && let Ok(m) = rget.at(path)
        {
            return Some(Arc::clone(m.value));
        }

        None
    }

    /// Methods with a route for `path`, sorted, for the `Allow` header.
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        let mut methods: Vec<String> = self
            .by_method
            .iter()
            .filter(|(_, r)| r.at(path).is_ok())
            .map(|(m, _)| m.as_str().to_string())
            .collect();
        methods.sort();
        methods
    }
}
