use thiserror::Error;

/// Errors surfaced by the client core.
///
/// Every layer (gateway, cache loader, mutation coordinator) reports through
/// this taxonomy so screens can decide presentation from [`Severity`] alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No stored credential, or the stored credential cannot be decoded.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Authenticated but not permitted (e.g. hand-over by a non-owner).
    #[error("Not permitted: {0}")]
    Unauthorized(String),

    /// The entity id has no backing record.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation conflicts with current server state
    /// (e.g. requesting an item that is no longer available).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before or by submission.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server answered with something the client cannot interpret
    /// (unexpected status, malformed envelope).
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// User-visible handling category for an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected outcome; show an informational notice (e.g. a double request).
    Info,
    /// Transient failure; show a generic retryable error notice.
    Retryable,
    /// Session is gone; redirect to login instead of an inline error.
    RequireLogin,
    /// The action cannot succeed as issued; show the error and stop.
    Blocking,
}

impl ApiError {
    /// Map the error onto the notice a screen should present.
    pub fn severity(&self) -> Severity {
        match self {
            ApiError::Conflict(_) => Severity::Info,
            ApiError::Network(_) | ApiError::Protocol(_) => Severity::Retryable,
            ApiError::Unauthenticated => Severity::RequireLogin,
            ApiError::Unauthorized(_) | ApiError::NotFound(_) | ApiError::Validation(_) => {
                Severity::Blocking
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_informational() {
        let err = ApiError::Conflict("item already requested".into());
        assert_eq!(err.severity(), Severity::Info);
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        assert_eq!(ApiError::Unauthenticated.severity(), Severity::RequireLogin);
    }

    #[test]
    fn network_and_protocol_are_retryable() {
        assert_eq!(
            ApiError::Network("timeout".into()).severity(),
            Severity::Retryable
        );
        assert_eq!(
            ApiError::Protocol("bad envelope".into()).severity(),
            Severity::Retryable
        );
    }
}
