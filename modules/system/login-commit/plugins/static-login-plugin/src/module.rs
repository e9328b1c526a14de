//! Static login plugin assembly.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, ensure};
use login_commit::{LoginCommitConfig, LoginService};
use login_commit_sdk::UserRegistry;
use tracing::info;

use crate::config::StaticLoginPluginConfig;
use crate::domain::{
    CertificateStep, HashtableStep, PasswordStep, StaticCredentialsService, StaticTokenIssuer,
    StaticUserRegistry, TokenStep,
};

/// Static login plugin.
///
/// Wires the static registry, credentials service and token issuer into a
/// [`LoginService`] with the steps in order: hashtable, token, certificate,
/// password.
pub struct StaticLoginPlugin {
    registry: Arc<StaticUserRegistry>,
    service: LoginService,
}

impl StaticLoginPlugin {
    /// Validate `cfg` and build the login service.
    ///
    /// # Errors
    ///
    /// Returns an error if the realm is empty, a user id is duplicated, or a
    /// token or certificate mapping names an unknown user.
    #[tracing::instrument(skip_all, fields(realm = %cfg.realm))]
    pub fn init(cfg: &StaticLoginPluginConfig, commit: &LoginCommitConfig) -> anyhow::Result<Self> {
        info!("Initializing static_login_plugin");
        validate(cfg)?;

        let registry = Arc::new(StaticUserRegistry::from_config(cfg));
        let issuer = Arc::new(StaticTokenIssuer::new(cfg.sso_token_lifetime_secs));
        let credentials = Arc::new(StaticCredentialsService::new(
            cfg.realm.clone(),
            cfg.credential.clone(),
            registry.groups_by_access_id(),
            issuer,
        ));

        let dyn_registry: Arc<dyn UserRegistry> = registry.clone();
        let service = LoginService::new(commit, credentials)
            .with_registry(dyn_registry.clone())
            .with_step(Arc::new(HashtableStep::new(dyn_registry.clone())))
            .with_step(Arc::new(TokenStep::new(dyn_registry.clone(), &cfg.tokens)))
            .with_step(Arc::new(CertificateStep::new(dyn_registry.clone())))
            .with_step(Arc::new(PasswordStep::new(dyn_registry)));

        info!(
            registry_kind = %cfg.registry_kind,
            user_count = registry.user_count(),
            token_count = cfg.tokens.len(),
            certificate_count = cfg.certificates.len(),
            commit_mode = ?commit.commit_mode,
            steps = ?service.step_names(),
            "Static login plugin initialized"
        );

        Ok(Self { registry, service })
    }

    #[must_use]
    pub fn service(&self) -> &LoginService {
        &self.service
    }

    #[must_use]
    pub fn registry(&self) -> &StaticUserRegistry {
        &self.registry
    }
}

fn validate(cfg: &StaticLoginPluginConfig) -> anyhow::Result<()> {
    ensure!(!cfg.realm.is_empty(), "realm must not be empty");

    let mut seen = HashSet::new();
    for user in &cfg.users {
        if !seen.insert(user.user_id.as_str()) {
            bail!("duplicate user '{}'", user.user_id);
        }
    }
    for mapping in &cfg.tokens {
        ensure!(
            seen.contains(mapping.user_id.as_str()),
            "token mapped to unknown user '{}'",
            mapping.user_id
        );
    }
    for mapping in &cfg.certificates {
        ensure!(
            seen.contains(mapping.user_id.as_str()),
            "certificate '{}' mapped to unknown user '{}'",
            mapping.subject_dn,
            mapping.user_id
        );
    }
    Ok(())
}
