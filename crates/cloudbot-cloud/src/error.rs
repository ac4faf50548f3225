//! Fleet provider error types

use thiserror::Error;

/// Fleet provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider rejected the request. Displays the provider's message verbatim.
    #[error("{message}")]
    Api { code: String, message: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Provider error code, when the provider supplied one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_provider_message() {
        let err = CloudError::api("conflict", "server is locked");
        assert_eq!(err.to_string(), "server is locked");
        assert_eq!(err.code(), Some("conflict"));
    }

    #[test]
    fn test_other_errors_have_no_code() {
        let err = CloudError::Timeout("5s".to_string());
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "Timeout: 5s");
    }
}
