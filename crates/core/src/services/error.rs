//! Error types for remote service calls.

use thiserror::Error;

/// Errors returned by the remote collaborators.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The service could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete within its time budget.
    #[error("Request timed out")]
    Timeout,

    /// The referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered with a non-success status.
    #[error("Service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The service answered but the payload is unusable.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Local I/O failure (e.g., reading a file location).
    #[error("I/O error: {0}")]
    Io(String),
}

impl ServiceError {
    /// Whether the failure happened before the service could judge the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(e.to_string())
        } else {
            Self::Io(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(ServiceError::Transport("refused".into()).is_transport());
        assert!(ServiceError::Timeout.is_transport());
        assert!(!ServiceError::NotFound("x".into()).is_transport());
        assert!(!ServiceError::Rejected {
            status: 500,
            message: "boom".into()
        }
        .is_transport());
    }

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: ServiceError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::Rejected {
            status: 422,
            message: "adresse invalide".into(),
        };
        assert_eq!(
            err.to_string(),
            "Service rejected request (422): adresse invalide"
        );
    }
}
