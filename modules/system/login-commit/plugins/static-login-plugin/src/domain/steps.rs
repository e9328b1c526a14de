//! Verification steps backed by the static registry.
//!
//! Every step declines a request once an earlier step has processed the
//! attempt, and declines request kinds it does not handle.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use login_commit_sdk::{
    LoginError, LoginRequest, SharedState, StepOutcome, UserRegistry, VerificationStep,
    VerifiedIdentity, hashtable_keys,
};
use login_security::constants::user_access_id;
use login_security::{AuthenticationMethod, PublicCredential};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::TokenMapping;

/// Public credential attribute carrying the certificate subject of a
/// certificate login.
pub const SUBJECT_DN_ATTRIBUTE: &str = "certificate.subject_dn";

fn identity_for(
    registry: &dyn UserRegistry,
    confirmed_id: &str,
    method: AuthenticationMethod,
) -> Result<VerifiedIdentity, LoginError> {
    let unique_id = registry.unique_user_id(confirmed_id)?;
    Ok(VerifiedIdentity::new(
        confirmed_id,
        user_access_id(registry.realm(), &unique_id),
        method,
    ))
}

/// Checks user name and password against the registry.
pub struct PasswordStep {
    registry: Arc<dyn UserRegistry>,
}

impl PasswordStep {
    #[must_use]
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl VerificationStep for PasswordStep {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn verify(
        &self,
        request: &LoginRequest,
        shared: &SharedState,
    ) -> Result<StepOutcome, LoginError> {
        if shared.is_already_processed() {
            return Ok(StepOutcome::Declined);
        }
        let LoginRequest::Password { user, password } = request else {
            return Ok(StepOutcome::Declined);
        };

        let Some(confirmed) = self.registry.check_password(user, password)? else {
            debug!(user = %user, "Password rejected");
            return Ok(StepOutcome::Declined);
        };
        let identity = identity_for(self.registry.as_ref(), &confirmed, AuthenticationMethod::Basic)?
            .with_raw_identifier(user.as_str());
        Ok(StepOutcome::Verified(identity))
    }
}

/// Accepts statically configured bearer tokens.
pub struct TokenStep {
    registry: Arc<dyn UserRegistry>,
    tokens: HashMap<String, String>,
}

impl TokenStep {
    #[must_use]
    pub fn new(registry: Arc<dyn UserRegistry>, tokens: &[TokenMapping]) -> Self {
        let tokens = tokens
            .iter()
            .map(|m| (m.token.expose_secret().to_owned(), m.user_id.clone()))
            .collect();
        Self { registry, tokens }
    }
}

#[async_trait]
impl VerificationStep for TokenStep {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn verify(
        &self,
        request: &LoginRequest,
        shared: &SharedState,
    ) -> Result<StepOutcome, LoginError> {
        if shared.is_already_processed() {
            return Ok(StepOutcome::Declined);
        }
        let LoginRequest::Token(token) = request else {
            return Ok(StepOutcome::Declined);
        };

        let Some(user_id) = self.tokens.get(token.expose_secret()) else {
            debug!("Unknown token");
            return Ok(StepOutcome::Declined);
        };
        let identity = identity_for(self.registry.as_ref(), user_id, AuthenticationMethod::Token)?;
        Ok(StepOutcome::Verified(identity))
    }
}

/// Maps client certificate subjects through the registry.
pub struct CertificateStep {
    registry: Arc<dyn UserRegistry>,
}

impl CertificateStep {
    #[must_use]
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl VerificationStep for CertificateStep {
    fn name(&self) -> &'static str {
        "certificate"
    }

    async fn verify(
        &self,
        request: &LoginRequest,
        shared: &SharedState,
    ) -> Result<StepOutcome, LoginError> {
        if shared.is_already_processed() {
            return Ok(StepOutcome::Declined);
        }
        let LoginRequest::Certificate { subject_dn } = request else {
            return Ok(StepOutcome::Declined);
        };

        let Some(confirmed) = self.registry.map_certificate(subject_dn)? else {
            debug!(subject_dn = %subject_dn, "Certificate not mapped to a user");
            return Ok(StepOutcome::Declined);
        };
        let identity =
            identity_for(self.registry.as_ref(), &confirmed, AuthenticationMethod::ClientCert)?
                .with_public_credential(PublicCredential::attribute(
                    SUBJECT_DN_ATTRIBUTE,
                    subject_dn.as_str(),
                ));
        Ok(StepOutcome::Verified(identity))
    }
}

/// Accepts an identity asserted upstream as a table of well-known keys.
///
/// `login.user_id` is required. `login.unique_id` skips the registry lookup
/// for the access id and `login.security_name` is used as the login identifier.
pub struct HashtableStep {
    registry: Arc<dyn UserRegistry>,
}

impl HashtableStep {
    #[must_use]
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl VerificationStep for HashtableStep {
    fn name(&self) -> &'static str {
        "hashtable"
    }

    async fn verify(
        &self,
        request: &LoginRequest,
        shared: &SharedState,
    ) -> Result<StepOutcome, LoginError> {
        if shared.is_already_processed() {
            return Ok(StepOutcome::Declined);
        }
        let LoginRequest::Hashtable(table) = request else {
            return Ok(StepOutcome::Declined);
        };
        let Some(user_id) = table.get(hashtable_keys::USER_ID) else {
            debug!("Hashtable without user id");
            return Ok(StepOutcome::Declined);
        };

        let unique_id = match table.get(hashtable_keys::UNIQUE_ID) {
            Some(unique) => unique.clone(),
            None => self.registry.unique_user_id(user_id)?,
        };
        let mut identity = VerifiedIdentity::new(
            user_id.as_str(),
            user_access_id(self.registry.realm(), &unique_id),
            AuthenticationMethod::Hashtable,
        );
        if let Some(name) = table.get(hashtable_keys::SECURITY_NAME) {
            identity = identity.with_raw_identifier(name.as_str());
        }
        Ok(StepOutcome::Verified(identity))
    }
}
