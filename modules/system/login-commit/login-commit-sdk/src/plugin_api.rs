//! Plugin API trait for verification strategies.
//!
//! Each strategy (password, certificate, token, hashtable) implements this
//! trait. The login service offers every request to its steps in order and
//! establishes each verified identity into the attempt's shared state.

use async_trait::async_trait;

use crate::error::LoginError;
use crate::models::{LoginRequest, SharedState, StepOutcome};

/// Plugin API trait for verification strategies.
#[async_trait]
pub trait VerificationStep: Send + Sync {
    /// Short, stable name used in logs.
    fn name(&self) -> &'static str;

    /// Check the presented credential.
    ///
    /// `shared` is read-only: steps may inspect what earlier steps established
    /// (e.g. `is_already_processed`) but only the login service writes to it.
    ///
    /// # Errors
    ///
    /// - `IdentityUnavailable` if the registry could not be consulted
    /// - `CredentialIssuanceFailed` for unexpected collaborator failures
    async fn verify(
        &self,
        request: &LoginRequest,
        shared: &SharedState,
    ) -> Result<StepOutcome, LoginError>;
}
