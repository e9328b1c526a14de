//! Scratch context construction.

use login_commit_sdk::{CredentialsError, CredentialsService, LoginError};
use login_security::constants::REGISTRY_CONFIRMED_ID_KEY;
use login_security::{
    AuthenticationMethod, PrimaryPrincipal, PrivateCredential, SecurityContext, run_elevated,
};

/// Build the attempt-local context for a verified identity.
///
/// The context holds exactly one primary principal and the primary credential
/// produced by `credentials`. When the registry-confirmed id differs from the
/// security name it is kept as a private attribute under
/// [`REGISTRY_CONFIRMED_ID_KEY`]. Runs in an elevation scope; nothing is
/// returned unless the whole construction succeeded.
///
/// # Errors
///
/// - `ElevationFailed` wrapping `CredentialIssuanceFailed` when the credentials
///   service fails or produces no primary credential
#[tracing::instrument(skip_all, fields(auth_method = %authentication_method))]
pub fn build_scratch_context(
    credentials: &dyn CredentialsService,
    security_name: &str,
    registry_confirmed_id: Option<&str>,
    access_id: &str,
    authentication_method: AuthenticationMethod,
) -> Result<SecurityContext, LoginError> {
    run_elevated(|| -> Result<SecurityContext, LoginError> {
        let mut scratch = SecurityContext::new();
        scratch.add_principal(PrimaryPrincipal::new(
            security_name,
            access_id,
            authentication_method,
        ));

        if let Some(confirmed) = registry_confirmed_id
            && confirmed != security_name
        {
            scratch.add_private_credential(PrivateCredential::attribute(
                REGISTRY_CONFIRMED_ID_KEY,
                confirmed,
            ));
        }

        credentials.set_credentials(&mut scratch)?;
        if scratch.primary_credential().is_none() {
            return Err(LoginError::CredentialIssuanceFailed(
                CredentialsError::NotProduced(security_name.to_owned()),
            ));
        }

        Ok(scratch)
    })
    .map_err(LoginError::ElevationFailed)
}
