use http::StatusCode;

use crate::core::Response;

/// Errors that know how to render themselves as an HTTP response.
pub trait ResponseError: std::error::Error + Send + Sync {
    /// Defaults to 500 Internal Server Error.
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Defaults to `{"error": "<display>"}` with [`status_code`](Self::status_code).
    fn error_response(&self) -> Response {
        let error_body = serde_json::json!({
            "error": self.to_string()
        });

        Response::json(self.status_code(), &error_body)
    }
}
