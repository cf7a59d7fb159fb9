//! Error taxonomy for the course-platform client.

use thiserror::Error;

/// Errors that can occur talking to the course platform.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Network/HTTP failure, including exhausted retries
    #[error("network error: {message}")]
    Network { message: String },

    /// Session bootstrap did not yield a usable session
    #[error("no active session: {message}")]
    NoSession { message: String },

    /// The portal answered with something we cannot interpret
    #[error("unexpected portal response: {message}")]
    UnexpectedResponse { message: String },
}

impl PortalError {
    /// True if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortalError::Network { .. })
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        PortalError::Network {
            message: err.to_string(),
        }
    }
}

/// Result of a login attempt, dispatched explicitly by the caller rather
/// than raised through the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// The portal rejected the credential.
    InvalidCredentials,
    /// Repeated bad credentials have temporarily disabled the account.
    AccountLocked,
    /// The portal was unreachable after retries; nothing is known about
    /// the credential.
    TransientNetworkFailure,
}

impl LoginOutcome {
    /// True when the stored credential itself is the problem.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            LoginOutcome::InvalidCredentials | LoginOutcome::AccountLocked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(PortalError::Network {
            message: "timeout".into()
        }
        .is_retryable());
        assert!(!PortalError::UnexpectedResponse {
            message: "html".into()
        }
        .is_retryable());
    }

    #[test]
    fn auth_failures_cover_invalid_and_locked() {
        assert!(LoginOutcome::InvalidCredentials.is_auth_failure());
        assert!(LoginOutcome::AccountLocked.is_auth_failure());
        assert!(!LoginOutcome::Success.is_auth_failure());
        assert!(!LoginOutcome::TransientNetworkFailure.is_auth_failure());
    }
}
