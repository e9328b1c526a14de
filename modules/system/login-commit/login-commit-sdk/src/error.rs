//! Error types for the login commit protocol.

use login_security::{BoxError, ElevationError};
use thiserror::Error;

use crate::models::SharedStateKey;

/// Errors surfaced to the caller of a login attempt.
///
/// Every collaborator error is wrapped into one of these kinds and kept
/// reachable through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum LoginError {
    /// No usable identity source: no registry and no login identifier, or no
    /// verification step established an identity.
    #[error("identity unavailable: {reason}")]
    IdentityUnavailable {
        reason: String,
        #[source]
        source: Option<RegistryError>,
    },

    /// A collaborator could not produce a credential.
    #[error("credential issuance failed")]
    CredentialIssuanceFailed(#[source] CredentialsError),

    /// The transfer into the live context was aborted. The attempt must be
    /// discarded. The cause chain ends in a [`CommitError`] when the protocol
    /// itself refused the transfer.
    #[error("commit failed")]
    CommitFailed(#[source] BoxError),

    /// An error was raised inside a bounded elevated operation.
    #[error("elevated operation failed")]
    ElevationFailed(#[source] ElevationError),
}

impl LoginError {
    #[must_use]
    pub fn identity_unavailable(reason: impl Into<String>) -> Self {
        Self::IdentityUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn commit_failed(cause: impl Into<BoxError>) -> Self {
        Self::CommitFailed(cause.into())
    }

    /// The [`CommitError`] somewhere in the cause chain, if any.
    #[must_use]
    pub fn commit_cause(&self) -> Option<&CommitError> {
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<CommitError>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl From<RegistryError> for LoginError {
    fn from(e: RegistryError) -> Self {
        Self::IdentityUnavailable {
            reason: "registry lookup failed".to_owned(),
            source: Some(e),
        }
    }
}

impl From<CredentialsError> for LoginError {
    fn from(e: CredentialsError) -> Self {
        Self::CredentialIssuanceFailed(e)
    }
}

/// Errors reported by a [`UserRegistry`](crate::UserRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry cannot be reached.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// The requested entry does not exist.
    #[error("entry not found: {0}")]
    EntryNotFound(String),
}

/// Errors reported by a [`CredentialsService`](crate::CredentialsService) or
/// [`CredentialIssuer`](crate::CredentialIssuer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    /// The context holds no primary principal to issue credentials for.
    #[error("no primary principal in context")]
    MissingPrincipal,

    /// The service finished without producing a primary credential.
    #[error("no primary credential was produced for '{0}'")]
    NotProduced(String),

    #[error("credential issuance failed: {0}")]
    Failed(String),
}

/// Reasons a commit aborts. Reported as the cause of [`LoginError::CommitFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// A required shared-state entry was never established.
    #[error("shared state has no {0} entry")]
    MissingSharedEntry(SharedStateKey),

    /// The live context already carries a different primary principal.
    #[error("live context already holds primary principal '{existing}', refusing '{incoming}'")]
    PrincipalConflict { existing: String, incoming: String },

    /// The attempt already reached `Committed` or `Failed`.
    #[error("login attempt is already {0}")]
    AttemptTerminated(&'static str),
}
