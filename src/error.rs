// Error handling module
// Defines storage, request-client and bootstrap failure types

use thiserror::Error;

/// Failures of the persisted key-value slot
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend rejected the operation
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// SQLite-backed store failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors surfaced by the authenticated request client
///
/// Pages get these back as-is; only the session bootstrap folds them.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response
    #[error("Request failed {status}: {message}")]
    Http { status: u16, message: String },

    /// Transport-level failure (connect, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response whose body is not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Request could not be built (bad URL or header)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal client error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return ApiError::Decode(e.to_string());
        }
        if e.is_builder() {
            return ApiError::InvalidRequest(e.to_string());
        }

        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else {
            "unknown"
        };
        ApiError::Network(format!("{} (kind: {})", e, kind))
    }
}

/// Authentication failures met while bootstrapping a session
///
/// Ordinary failures fold into an unauthenticated session. Only the ones
/// reported by [`AuthFailure::is_unexpected`] reach the `Error` state.
#[derive(Error, Debug)]
pub enum AuthFailure {
    /// Could not reach an auth endpoint (includes bootstrap step timeouts)
    #[error("Network failure reaching {endpoint}: {message}")]
    NetworkFailure {
        endpoint: &'static str,
        message: String,
    },

    /// Callback endpoint answered non-2xx (reused or invalid code)
    #[error("Code exchange rejected with status {status}")]
    ExchangeRejected { status: u16 },

    /// Callback endpoint answered 2xx without an access token
    #[error("Code exchange returned no access token")]
    MissingAccessToken,

    /// Identity endpoint answered non-2xx (expired or invalid token)
    #[error("Profile request rejected with status {status}")]
    ProfileRejected { status: u16 },

    /// 2xx body that does not decode
    #[error("Malformed response from {endpoint}: {message}")]
    Malformed {
        endpoint: &'static str,
        message: String,
    },

    /// Token store could not be read or written
    #[error("Token storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Anything else the client could not classify
    #[error("Unexpected failure calling {endpoint}: {message}")]
    Unexpected {
        endpoint: &'static str,
        message: String,
    },
}

impl AuthFailure {
    /// Map a client error for `endpoint`; `rejected` builds the variant used
    /// for non-2xx statuses.
    pub fn from_api(endpoint: &'static str, err: ApiError, rejected: fn(u16) -> Self) -> Self {
        match err {
            ApiError::Http { status, .. } => rejected(status),
            ApiError::Network(message) => AuthFailure::NetworkFailure { endpoint, message },
            ApiError::Decode(message) => AuthFailure::Malformed { endpoint, message },
            ApiError::InvalidRequest(message) => AuthFailure::Unexpected { endpoint, message },
            ApiError::Internal(e) => AuthFailure::Unexpected {
                endpoint,
                message: e.to_string(),
            },
        }
    }

    /// True when the failure must surface as `Error` instead of "not logged in"
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            AuthFailure::Malformed { .. } | AuthFailure::Storage(_) | AuthFailure::Unexpected { .. }
        )
    }
}

/// Result type alias for request client operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_embeds_status() {
        let err = ApiError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed 404: not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_exchange_rejection_mapping() {
        let err = ApiError::Http {
            status: 500,
            message: String::new(),
        };
        let failure = AuthFailure::from_api("/api/auth/callback", err, |status| {
            AuthFailure::ExchangeRejected { status }
        });
        assert!(matches!(failure, AuthFailure::ExchangeRejected { status: 500 }));
        assert!(!failure.is_unexpected());
    }

    #[test]
    fn test_profile_rejection_mapping() {
        let err = ApiError::Http {
            status: 401,
            message: "expired".to_string(),
        };
        let failure = AuthFailure::from_api("/api/auth/me", err, |status| {
            AuthFailure::ProfileRejected { status }
        });
        assert_eq!(failure.to_string(), "Profile request rejected with status 401");
        assert!(!failure.is_unexpected());
    }

    #[test]
    fn test_network_failure_is_expected() {
        let failure = AuthFailure::from_api(
            "/api/auth/me",
            ApiError::Network("timed out".to_string()),
            |status| AuthFailure::ProfileRejected { status },
        );
        assert!(matches!(failure, AuthFailure::NetworkFailure { .. }));
        assert!(!failure.is_unexpected());
    }

    #[test]
    fn test_decode_failure_is_unexpected() {
        let failure = AuthFailure::from_api(
            "/api/auth/me",
            ApiError::Decode("expected value at line 1".to_string()),
            |status| AuthFailure::ProfileRejected { status },
        );
        assert!(matches!(failure, AuthFailure::Malformed { .. }));
        assert!(failure.is_unexpected());
    }

    #[test]
    fn test_storage_failure_is_unexpected() {
        let failure = AuthFailure::from(StorageError::Backend("quota exceeded".to_string()));
        assert!(failure.is_unexpected());
        assert_eq!(
            failure.to_string(),
            "Token storage failed: Storage backend error: quota exceeded"
        );
    }

    #[test]
    fn test_missing_token_is_expected() {
        assert!(!AuthFailure::MissingAccessToken.is_unexpected());
    }
}
