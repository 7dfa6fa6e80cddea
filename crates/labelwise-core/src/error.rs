//! Error types for labelwise.

use thiserror::Error;

/// Result type alias using labelwise's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when the backend gives no usable detail.
pub const GENERIC_FAILURE: &str = "Request failed";

/// Core error type for labelwise operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP/network request failed before a response arrived
    #[error("Request error: {0}")]
    Request(String),

    /// Backend rejected the request (validation or server failure)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication failed or the session has ended
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not authorized)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input rejected on the client before sending
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an error from an HTTP status and the server-provided message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Unauthorized(_) => Some(401),
            Error::Forbidden(_) => Some(403),
            Error::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// True for the session-ending 401 condition.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// One-line message for a user-facing notice: the server's message when
    /// there is one, otherwise the generic fallback.
    pub fn notice(&self) -> String {
        let message = match self {
            Error::Api { message, .. }
            | Error::Unauthorized(message)
            | Error::Forbidden(message)
            | Error::NotFound(message)
            | Error::InvalidInput(message) => message.trim(),
            _ => "",
        };
        if message.is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message.to_string()
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::from_status(status.as_u16(), e.to_string()),
            None if e.is_decode() => Error::Serialization(e.to_string()),
            None => Error::Request(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_api() {
        let err = Error::Api {
            status: 400,
            message: "Not enough line items to assign".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error (400): Not enough line items to assign"
        );
    }

    #[test]
    fn test_error_display_unauthorized() {
        let err = Error::Unauthorized("invalid token".to_string());
        assert_eq!(err.to_string(), "Unauthorized: invalid token");
    }

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(Error::from_status(401, "x"), Error::Unauthorized(_)));
        assert!(matches!(Error::from_status(403, "x"), Error::Forbidden(_)));
        assert!(matches!(Error::from_status(404, "x"), Error::NotFound(_)));
        assert!(matches!(
            Error::from_status(422, "x"),
            Error::Api { status: 422, .. }
        ));
    }

    #[test]
    fn test_status_round_trips() {
        assert_eq!(Error::from_status(401, "x").status(), Some(401));
        assert_eq!(Error::from_status(500, "x").status(), Some(500));
        assert_eq!(Error::Request("down".into()).status(), None);
    }

    #[test]
    fn test_notice_prefers_server_message() {
        let err = Error::from_status(400, "Task not found");
        assert_eq!(err.notice(), "Task not found");
    }

    #[test]
    fn test_notice_falls_back_to_generic() {
        assert_eq!(Error::from_status(500, "  ").notice(), GENERIC_FAILURE);
        assert_eq!(
            Error::Request("connection refused".into()).notice(),
            GENERIC_FAILURE
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
