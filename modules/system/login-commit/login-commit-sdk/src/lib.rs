//! Login Commit SDK
//!
//! This crate provides the public API for the `login_commit` module:
//!
//! - [`UserRegistry`], [`CredentialsService`], [`CredentialIssuer`], [`SsoTokenLookup`] -
//!   collaborator traits the commit protocol calls into
//! - [`VerificationStep`] - Plugin API trait for verification strategies
//! - [`SharedState`] - Cross-step state of one login attempt
//! - [`LoginError`] - Error types
//!
//! ## Usage
//!
//! A verification strategy checks the presented credential and reports the
//! verified identity; the login service resolves, aggregates and commits it:
//!
//! ```ignore
//! use login_commit_sdk::{StepOutcome, VerificationStep};
//!
//! match step.verify(&request, attempt.shared_state()).await? {
//!     StepOutcome::Verified(identity) => service.establish(&mut attempt, &identity)?,
//!     StepOutcome::Declined => {}
//! }
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod plugin_api;

// Re-export main types at crate root
pub use api::{
    CredentialIssuer, CredentialsService, FirstSsoTokenLookup, SsoTokenLookup, UserRegistry,
};
pub use error::{CommitError, CredentialsError, LoginError, RegistryError};
pub use models::{
    LoginRequest, RegistryKind, SharedState, SharedStateKey, StepOutcome, VerifiedIdentity,
    hashtable_keys,
};
pub use plugin_api::VerificationStep;
