mod response_error;
mod web_error;

pub use response_error::ResponseError;
pub use web_error::WebError;

use http::StatusCode;

use crate::issuer::IssueError;
use crate::sku::CodeError;
use crate::store::StoreError;

pub fn not_found<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(StatusCode::NOT_FOUND, msg.to_string()))
}

pub fn method_not_allowed<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        msg.to_string(),
    ))
}

pub fn request_timeout<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(StatusCode::REQUEST_TIMEOUT, msg.to_string()))
}

pub fn payload_too_large<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(StatusCode::PAYLOAD_TOO_LARGE, msg.to_string()))
}

pub fn uri_too_long<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(StatusCode::URI_TOO_LONG, msg.to_string()))
}

pub fn header_fields_too_large<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(
        StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        msg.to_string(),
    ))
}

pub fn internal_error<T: std::fmt::Display>(msg: T) -> WebError {
    WebError::new(SimpleError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        msg.to_string(),
    ))
}

/// A status and a message.
#[derive(Debug)]
pub struct SimpleError {
    status: StatusCode,
    message: String,
}

impl SimpleError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}

impl ResponseError for SimpleError {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}

// Exhaustion is permanent and the caller's to act on; storage trouble is ours
// and may clear up.
impl ResponseError for IssueError {
    fn status_code(&self) -> StatusCode {
        match self {
            IssueError::Store(err) if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            IssueError::Store(StoreError::SpaceExhausted { .. }) => StatusCode::CONFLICT,
            // misconfigured seed
            IssueError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            IssueError::Code(CodeError::OutOfRange(_) | CodeError::InvalidCode(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IssueError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sku::MAX_COUNT;

    #[test]
    fn issue_errors_map_to_statuses() {
        let cases = [
            (
                IssueError::Store(StoreError::SpaceExhausted { cursor: MAX_COUNT }),
                StatusCode::CONFLICT,
            ),
            (
                IssueError::Store(StoreError::Busy("locked".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                IssueError::Store(StoreError::Unavailable("gone".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                IssueError::Store(StoreError::InvalidInitialValue(-1)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                IssueError::Code(CodeError::OutOfRange(MAX_COUNT)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                IssueError::Task("panicked".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn exhaustion_body_names_the_condition() {
        let res = WebError::from(IssueError::Store(StoreError::SpaceExhausted {
            cursor: MAX_COUNT,
        }))
        .into_response();
        let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("no more codes"));
    }

    #[test]
    fn helpers_carry_their_status() {
        assert_eq!(not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(method_not_allowed("x").status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(request_timeout("x").status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(payload_too_large("x").status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(uri_too_long("x").status_code(), StatusCode::URI_TOO_LONG);
        assert_eq!(
            header_fields_too_large("x").status_code(),
            StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
        );
        assert_eq!(internal_error("x").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
