use crate::response_code::ResponseCode;
use thiserror::Error;

/// Client Registry precondition failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no registered client matches")]
    NotFound,

    #[error("endpoint is already registered")]
    Conflict,
}

/// Main error type for LwM2M server operations
#[derive(Error, Debug)]
pub enum Lwm2mError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(ResponseCode),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout")]
    Timeout,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Lwm2mError {
    /// Shorthand for a malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Response code to report to a peer for this error
    ///
    /// Used where an error has to be turned back into a protocol answer
    /// rather than propagated.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::Protocol(code) => *code,
            Self::Registry(RegistryError::NotFound) => ResponseCode::NotFound,
            Self::Registry(RegistryError::Conflict) => ResponseCode::Conflict,
            Self::MalformedPayload(_) | Self::InvalidData(_) => ResponseCode::BadRequest,
            Self::Connection(_) | Self::Transport(_) | Self::Timeout => {
                ResponseCode::InternalServerError
            }
        }
    }
}

/// Result type alias for LwM2M operations
pub type Lwm2mResult<T> = Result<T, Lwm2mError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts() {
        let err: Lwm2mError = RegistryError::Conflict.into();
        assert!(matches!(err, Lwm2mError::Registry(RegistryError::Conflict)));
        assert_eq!(err.response_code(), ResponseCode::Conflict);
    }

    #[test]
    fn test_error_display() {
        let err = Lwm2mError::Protocol(ResponseCode::NotFound);
        assert_eq!(err.to_string(), "Protocol error: 4.04 Not Found");
        assert_eq!(Lwm2mError::malformed("short").to_string(), "Malformed payload: short");
    }
}
