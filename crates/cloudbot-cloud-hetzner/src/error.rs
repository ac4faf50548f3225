//! Hetzner Cloud provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HetznerError {
    #[error("Hetzner API token is missing")]
    MissingToken,

    #[error("Hetzner authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{message}")]
    Api { code: String, message: String },

    #[error("Unexpected response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<HetznerError> for cloudbot_cloud::CloudError {
    fn from(err: HetznerError) -> Self {
        use cloudbot_cloud::CloudError;
        match err {
            HetznerError::MissingToken => CloudError::InvalidConfig(err.to_string()),
            HetznerError::AuthenticationFailed(msg) => CloudError::AuthenticationFailed(msg),
            HetznerError::Api { code, message } => CloudError::Api { code, message },
            HetznerError::UnexpectedResponse { .. } => CloudError::Http(err.to_string()),
            HetznerError::Http(e) if e.is_timeout() => CloudError::Timeout(e.to_string()),
            HetznerError::Http(e) => CloudError::Http(e.to_string()),
            HetznerError::JsonError(e) => CloudError::Json(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, HetznerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbot_cloud::CloudError;

    #[test]
    fn test_api_error_keeps_code_and_message() {
        let err: CloudError = HetznerError::Api {
            code: "uniqueness_error".to_string(),
            message: "server name is already used".to_string(),
        }
        .into();
        assert_eq!(err.code(), Some("uniqueness_error"));
        assert_eq!(err.to_string(), "server name is already used");
    }

    #[test]
    fn test_auth_error_maps_to_authentication_failed() {
        let err: CloudError = HetznerError::AuthenticationFailed("bad token".to_string()).into();
        assert!(matches!(err, CloudError::AuthenticationFailed(_)));
    }
}
