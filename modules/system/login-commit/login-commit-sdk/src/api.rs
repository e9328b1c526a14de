//! Collaborator traits called by the commit protocol.
//!
//! Implementations are externally synchronized, read-mostly services. The
//! protocol issues at most one call to each per step and treats the calls as
//! synchronous.

use login_security::{PrimaryPrincipal, SecurityContext, SsoCredential};
use secrecy::SecretString;

use crate::error::{CredentialsError, RegistryError};
use crate::models::RegistryKind;

/// User registry used to confirm and name identities.
pub trait UserRegistry: Send + Sync {
    fn kind(&self) -> RegistryKind;

    /// Realm used when building access ids.
    fn realm(&self) -> &str;

    /// Map a registry-confirmed id to its display security name.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the registry cannot be reached
    /// - `EntryNotFound` if the id is unknown
    fn user_security_name(&self, confirmed_id: &str) -> Result<Option<String>, RegistryError>;

    /// Unique id of the user, used to build the access id.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the registry cannot be reached
    /// - `EntryNotFound` if the id is unknown
    fn unique_user_id(&self, confirmed_id: &str) -> Result<String, RegistryError>;

    /// Check a password. Returns the registry-confirmed id on success.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the registry cannot be reached
    fn check_password(
        &self,
        user: &str,
        password: &SecretString,
    ) -> Result<Option<String>, RegistryError>;

    /// Map a client certificate subject to a registry-confirmed id.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the registry cannot be reached
    fn map_certificate(&self, _subject_dn: &str) -> Result<Option<String>, RegistryError> {
        Ok(None)
    }
}

/// Materializes derived credentials for the principal placed into a context.
pub trait CredentialsService: Send + Sync {
    /// Populate the primary credential (and any derived credentials) of `ctx`
    /// from its primary principal.
    ///
    /// # Errors
    ///
    /// - `MissingPrincipal` if `ctx` holds no primary principal
    /// - `Failed` if the credential could not be produced
    fn set_credentials(&self, ctx: &mut SecurityContext) -> Result<(), CredentialsError>;
}

/// Produces verifiable credentials for a resolved identity.
pub trait CredentialIssuer: Send + Sync {
    /// Issue a reusable SSO token for `principal`.
    ///
    /// # Errors
    ///
    /// - `Failed` if the token could not be issued
    fn issue_sso_token(&self, principal: &PrimaryPrincipal)
    -> Result<SsoCredential, CredentialsError>;
}

/// Locates the SSO token held by a context.
pub trait SsoTokenLookup: Send + Sync {
    fn sso_token<'a>(&self, ctx: &'a SecurityContext) -> Option<&'a SsoCredential>;
}

/// Default lookup: the first SSO token among the private credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSsoTokenLookup;

impl SsoTokenLookup for FirstSsoTokenLookup {
    fn sso_token<'a>(&self, ctx: &'a SecurityContext) -> Option<&'a SsoCredential> {
        ctx.sso_credential()
    }
}
