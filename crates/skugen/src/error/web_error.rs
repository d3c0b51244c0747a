use super::ResponseError;
use crate::core::Response;

/// Error returned by handlers and middleware; wraps any [`ResponseError`].
#[derive(Debug)]
pub struct WebError {
    inner: Box<dyn ResponseError>,
}

impl WebError {
    pub fn new<T: ResponseError + 'static>(err: T) -> Self {
        Self {
            inner: Box::new(err),
        }
    }

    pub fn status_code(&self) -> http::StatusCode {
        self.inner.status_code()
    }

    /// Log and render. Server-side failures log at `error`, client errors at `info`.
    pub fn into_response(self) -> Response {
        let status = self.inner.status_code();
        if status.is_server_error() {
            tracing::error!(status_code = %status, error = %self.inner, "request failed");
        } else {
            tracing::info!(status_code = %status, error = %self.inner, "request rejected");
        }

        self.inner.error_response()
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<crate::error::SimpleError> for WebError {
    fn from(err: crate::error::SimpleError) -> Self {
        Self::new(err)
    }
}

impl From<crate::issuer::IssueError> for WebError {
    fn from(err: crate::issuer::IssueError) -> Self {
        Self::new(err)
    }
}
