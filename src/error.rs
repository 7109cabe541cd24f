use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckinError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid private key: {0}")]
    InvalidCredential(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Token store error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure marker returned by every remote call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}{}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    /// Masked proxy URL the request went through, if any.
    pub proxy: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
            proxy: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        if !body.is_empty() {
            self.body = Some(body);
        }
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// One-line rendering with every diagnostic field, for logs.
    pub fn detail(&self) -> String {
        format!(
            "message={:?} status={} data={} proxy={}",
            self.message,
            self.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            self.body.as_deref().unwrap_or("-"),
            self.proxy.as_deref().unwrap_or("None"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status() {
        let err = ApiError::new("Request failed").with_status(401);
        assert_eq!(err.to_string(), "Request failed (HTTP 401)");
        assert_eq!(ApiError::new("timeout").to_string(), "timeout");
    }

    #[test]
    fn test_empty_body_is_dropped() {
        let err = ApiError::new("x").with_body("");
        assert!(err.body.is_none());
        let err = ApiError::new("x").with_body("{\"success\":false}");
        assert!(err.detail().contains("success"));
    }
}
