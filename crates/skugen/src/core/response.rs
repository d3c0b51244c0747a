use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};

/// A fully buffered response.
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    fn with_content_type(status: StatusCode, content_type: &'static str, body: Bytes) -> Self {
        let mut res = Self::new(status);
        res.headers
            .insert(http::header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        res.body = body;
        res
    }

    pub fn text<S: Into<String>>(status: StatusCode, body: S) -> Self {
        Self::with_content_type(status, "text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    pub fn html(status: StatusCode, body: &'static str) -> Self {
        Self::with_content_type(status, "text/html; charset=utf-8", Bytes::from_static(body.as_bytes()))
    }

    /// Serialize `value` as the body. A value that fails to serialize yields an
    /// empty 500.
    pub fn json(status: StatusCode, value: impl serde::Serialize) -> Self {
        match serde_json::to_vec(&value) {
            Ok(bytes) => Self::with_content_type(status, "application/json", Bytes::from(bytes)),
            Err(err) => {
                tracing::error!(error = %err, "response serialization failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// No body and no content-type.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status)
    }

    pub fn set_header<K, V>(&mut self, k: K, v: V)
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
    {
        if let (Ok(key), Ok(value)) = (k.try_into(), v.try_into()) {
            self.headers.insert(key, value);
        }
    }

    pub fn header<K, V>(mut self, k: K, v: V) -> Self
    where
        K: TryInto<http::HeaderName>,
        V: TryInto<HeaderValue>,
    {
        self.set_header(k, v);
        self
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
