//! Refresh error types
//!
//! Every failure a single widget update can hit. All of them are caught at
//! the per-widget boundary and never stop the loop.

use thiserror::Error;

/// Errors that can occur while refreshing one chart widget
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    /// Request never produced a response (connect failure, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Body is not JSON or does not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Widget host rejected the partial update
    #[error("Widget error: {0}")]
    Widget(String),
}

impl RefreshError {
    /// True for failures that mean the API could not be reached properly.
    pub fn is_network(&self) -> bool {
        matches!(self, RefreshError::Network(_) | RefreshError::Status { .. })
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RefreshError::Parse(err.to_string())
        } else {
            RefreshError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RefreshError {
    fn from(err: serde_json::Error) -> Self {
        RefreshError::Parse(err.to_string())
    }
}

/// Result type alias for refresh operations
pub type RefreshResult<T> = Result<T, RefreshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RefreshError::Status {
            status: 502,
            url: "http://localhost:5000/api/forecast".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 502 from http://localhost:5000/api/forecast"
        );

        let err = RefreshError::Widget("unknown widget: fooChart".to_string());
        assert_eq!(err.to_string(), "Widget error: unknown widget: fooChart");
    }

    #[test]
    fn test_network_family() {
        assert!(RefreshError::Network("refused".into()).is_network());
        assert!(RefreshError::Status {
            status: 500,
            url: String::new()
        }
        .is_network());
        assert!(!RefreshError::Parse("missing field".into()).is_network());
        assert!(!RefreshError::Widget("gone".into()).is_network());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RefreshError = json_err.into();
        assert!(matches!(err, RefreshError::Parse(_)));
    }
}
