use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoomGenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Upstream error ({status}): {message}")]
    UpstreamError { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RoomGenError {
    /// HTTP status the route layer should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RoomGenError::ValidationError(_) => 400,
            RoomGenError::NotFound(_) => 404,
            RoomGenError::UpstreamError { .. } | RoomGenError::ResponseError(_) => 502,
            RoomGenError::RequestError(_) => 503,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for RoomGenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RoomGenError::ResponseError(err.to_string())
        } else {
            RoomGenError::RequestError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RoomGenError {
    fn from(err: serde_json::Error) -> Self {
        RoomGenError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for RoomGenError {
    fn from(err: std::io::Error) -> Self {
        RoomGenError::StorageError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoomGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RoomGenError::ValidationError("x".into()).status_code(), 400);
        assert_eq!(
            RoomGenError::UpstreamError {
                status: 401,
                message: "bad key".into()
            }
            .status_code(),
            502
        );
        assert_eq!(RoomGenError::StorageError("disk".into()).status_code(), 500);
        assert_eq!(RoomGenError::NotFound("task-1".into()).status_code(), 404);
    }

    #[test]
    fn test_display_messages() {
        let err = RoomGenError::UpstreamError {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(err.to_string(), "Upstream error (503): overloaded");
        assert_eq!(
            RoomGenError::ConfigError("missing key".into()).to_string(),
            "Configuration error: missing key"
        );
    }
}
