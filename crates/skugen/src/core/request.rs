use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, Uri};

use crate::core::data::AppData;

#[derive(Debug)]
pub struct Request {
    pub inner: http::Request<Bytes>,
    pub app_data: Option<Arc<AppData>>,
}

impl Request {
    /// A path that is not a valid URI is replaced by `/`.
    pub fn new<M: Into<Method>, S: AsRef<str>>(method: M, path: S) -> Self {
        let mut inner = http::Request::new(Bytes::new());
        *inner.method_mut() = method.into();
        *inner.uri_mut() = path
            .as_ref()
            .parse::<Uri>()
            .unwrap_or_else(|_| Uri::from_static("/"));

        Self {
            inner,
            app_data: None,
        }
    }

    pub fn header<K, V>(mut self, k: K, v: V) -> Self
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (k.try_into(), v.try_into()) {
            self.inner.headers_mut().insert(key, value);
        }
        self
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        *self.inner.body_mut() = body.into();
        self
    }

    pub fn with_app_data(mut self, app_data: Arc<AppData>) -> Self {
        self.app_data = Some(app_data);
        self
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap<HeaderValue> {
        self.inner.headers_mut()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Value installed with [`crate::App::set_app_share_data`].
    pub fn get_app_share_data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.app_data.as_ref().and_then(|data| data.get::<T>())
    }
}
