use thiserror::Error;

/// Failure talking to the hosted backend (auth or row store)
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// An operation needed a signed-in session and there was none
    #[error("no active session")]
    NoSession,
}

/// Failure surfaced to callers of the auth operations
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the credentials or the request
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            // GoTrue reports bad credentials and duplicate sign-ups as 4xx bodies
            BackendError::Status { status, message } if (400..500).contains(&status) => {
                AuthError::Rejected(message)
            }
            other => AuthError::Backend(other),
        }
    }
}

/// Failure reading or writing the local key/value store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_become_rejections() {
        let err: AuthError = BackendError::Status {
            status: 400,
            message: "Invalid login credentials".into(),
        }
        .into();
        assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invalid login credentials"));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn server_errors_stay_backend_errors() {
        let err: AuthError = BackendError::Status {
            status: 503,
            message: "unavailable".into(),
        }
        .into();
        assert!(matches!(err, AuthError::Backend(BackendError::Status { status: 503, .. })));
    }
}
