//! Credential issuance for the static plugin.

use std::collections::BTreeMap;
use std::sync::Arc;

use login_commit_sdk::{CredentialIssuer, CredentialsError, CredentialsService};
use login_security::{PrimaryCredential, PrimaryPrincipal, SecurityContext, SsoCredential};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::CredentialConfig;

fn expires_after(lifetime_secs: u64) -> Result<OffsetDateTime, CredentialsError> {
    i64::try_from(lifetime_secs)
        .ok()
        .and_then(|secs| OffsetDateTime::now_utc().checked_add(Duration::seconds(secs)))
        .ok_or_else(|| CredentialsError::Failed(format!("lifetime of {lifetime_secs}s is out of range")))
}

/// Issues random SSO tokens with a fixed lifetime.
#[derive(Debug, Clone)]
pub struct StaticTokenIssuer {
    lifetime_secs: u64,
}

impl StaticTokenIssuer {
    #[must_use]
    pub fn new(lifetime_secs: u64) -> Self {
        Self { lifetime_secs }
    }
}

impl CredentialIssuer for StaticTokenIssuer {
    fn issue_sso_token(
        &self,
        principal: &PrimaryPrincipal,
    ) -> Result<SsoCredential, CredentialsError> {
        let expiration = expires_after(self.lifetime_secs)?;
        debug!(access_id = principal.access_id(), %expiration, "Issued SSO token");
        Ok(SsoCredential::new(Uuid::new_v4().to_string(), expiration))
    }
}

/// Populates the primary credential and, when absent, an SSO token.
pub struct StaticCredentialsService {
    realm: String,
    credential: CredentialConfig,
    groups: BTreeMap<String, Vec<String>>,
    issuer: Arc<dyn CredentialIssuer>,
}

impl StaticCredentialsService {
    #[must_use]
    pub fn new(
        realm: impl Into<String>,
        credential: CredentialConfig,
        groups: BTreeMap<String, Vec<String>>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Self {
        Self {
            realm: realm.into(),
            credential,
            groups,
            issuer,
        }
    }
}

impl CredentialsService for StaticCredentialsService {
    fn set_credentials(&self, ctx: &mut SecurityContext) -> Result<(), CredentialsError> {
        let principal = ctx
            .primary_principal()
            .cloned()
            .ok_or(CredentialsError::MissingPrincipal)?;

        let credential = if self.credential.expirable {
            let expiration = expires_after(self.credential.lifetime_secs)?;
            PrimaryCredential::expirable(&principal, &self.realm, expiration)
        } else {
            PrimaryCredential::new(&principal, &self.realm)
        };
        let groups = self
            .groups
            .get(principal.access_id())
            .cloned()
            .unwrap_or_default();
        ctx.add_public_credential(credential.with_groups(groups));

        if ctx.sso_credential().is_none() {
            let token = self.issuer.issue_sso_token(&principal)?;
            ctx.add_private_credential(token);
        }
        Ok(())
    }
}
