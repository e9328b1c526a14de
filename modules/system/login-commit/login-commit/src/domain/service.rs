//! Login service: runs verification steps and drives the commit protocol.

use std::sync::Arc;

use login_commit_sdk::{
    CommitError, CredentialsService, FirstSsoTokenLookup, LoginError, LoginRequest,
    SsoTokenLookup, StepOutcome, UserRegistry, VerificationStep, VerifiedIdentity,
};
use login_security::{AuthenticationMethod, SecurityContext};
use tracing::{debug, info};

use super::{
    CommitCoordinator, LoginAttempt, aggregate, build_scratch_context, resolve_security_name,
};
use crate::config::LoginCommitConfig;

/// Orchestrates login attempts against a fixed set of collaborators.
///
/// Collaborators are shared (`Arc`) and may serve many attempts; each attempt
/// keeps its own [`LoginAttempt`] state.
pub struct LoginService {
    config: LoginCommitConfig,
    registry: Option<Arc<dyn UserRegistry>>,
    credentials: Arc<dyn CredentialsService>,
    sso: Arc<dyn SsoTokenLookup>,
    steps: Vec<Arc<dyn VerificationStep>>,
    coordinator: CommitCoordinator,
}

impl LoginService {
    #[must_use]
    pub fn new(config: &LoginCommitConfig, credentials: Arc<dyn CredentialsService>) -> Self {
        let sso: Arc<dyn SsoTokenLookup> = Arc::new(FirstSsoTokenLookup);
        Self {
            config: config.clone(),
            registry: None,
            credentials,
            coordinator: CommitCoordinator::new(config, sso.clone()),
            sso,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn UserRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the strategy used to find the SSO token of a context.
    #[must_use]
    pub fn with_sso_lookup(mut self, sso: Arc<dyn SsoTokenLookup>) -> Self {
        self.coordinator = CommitCoordinator::new(&self.config, sso.clone());
        self.sso = sso;
        self
    }

    /// Append a verification step. Steps run in insertion order.
    #[must_use]
    pub fn with_step(mut self, step: Arc<dyn VerificationStep>) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every configured step against `request` and commit the established
    /// identity into `live`.
    ///
    /// # Errors
    ///
    /// - `IdentityUnavailable` if no step verified the request
    /// - any error raised while establishing an identity or committing it;
    ///   `live` is untouched unless the commit mode is in-place
    #[tracing::instrument(skip_all, fields(attempt_id))]
    pub async fn login(
        &self,
        request: &LoginRequest,
        live: &mut SecurityContext,
    ) -> Result<LoginAttempt, LoginError> {
        let mut attempt = LoginAttempt::new();
        tracing::Span::current().record("attempt_id", tracing::field::display(attempt.id()));

        for step in &self.steps {
            let outcome = match step.verify(request, attempt.shared_state()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    attempt.fail();
                    return Err(log_and_convert("verify", e));
                }
            };
            match outcome {
                StepOutcome::Verified(identity) => {
                    debug!(step = step.name(), "Verification step accepted the request");
                    self.establish(&mut attempt, &identity)
                        .map_err(|e| log_and_convert("establish", e))?;
                }
                StepOutcome::Declined => {
                    debug!(step = step.name(), "Verification step declined");
                }
            }
        }

        if attempt.aggregations() == 0 {
            attempt.fail();
            return Err(log_and_convert(
                "login",
                LoginError::identity_unavailable("no verification step accepted the request"),
            ));
        }

        self.commit(&mut attempt, live)
            .map_err(|e| log_and_convert("commit", e))?;
        Ok(attempt)
    }

    /// Resolve, build and aggregate one verified identity into `attempt`.
    ///
    /// Fails the attempt on any error.
    ///
    /// # Errors
    ///
    /// - `IdentityUnavailable` from security name resolution
    /// - `ElevationFailed` from scratch context construction
    /// - `CommitFailed` if the attempt is already terminal
    #[tracing::instrument(skip_all, fields(attempt_id = %attempt.id(), auth_method = %identity.authentication_method))]
    pub fn establish(
        &self,
        attempt: &mut LoginAttempt,
        identity: &VerifiedIdentity,
    ) -> Result<(), LoginError> {
        if attempt.is_terminal() {
            return Err(LoginError::commit_failed(CommitError::AttemptTerminated(
                attempt.state().as_str(),
            )));
        }

        attempt.begin_resolving();
        let security_name = match resolve_security_name(
            self.registry.as_deref(),
            identity.raw_identifier.as_deref(),
            &identity.registry_confirmed_id,
        ) {
            Ok(name) => name,
            Err(e) => {
                attempt.fail();
                return Err(e);
            }
        };

        let mut scratch = match build_scratch_context(
            self.credentials.as_ref(),
            &security_name,
            Some(&identity.registry_confirmed_id),
            &identity.access_id,
            identity.authentication_method,
        ) {
            Ok(scratch) => scratch,
            Err(e) => {
                attempt.fail();
                return Err(e);
            }
        };
        attempt.scratch_built();

        identity.attach_extras(&mut scratch);
        aggregate(&scratch, attempt.shared_state_mut(), self.sso.as_ref());
        attempt.record_aggregation(scratch);
        attempt.mark_already_processed();

        info!(security_name = %security_name, access_id = %identity.access_id, "Identity established");
        Ok(())
    }

    /// Commit an aggregated attempt into `live`. Succeeds at most once per attempt.
    ///
    /// # Errors
    ///
    /// - `CommitFailed` if the attempt is terminal, has no shared principal,
    ///   or the transfer was refused
    pub fn commit(
        &self,
        attempt: &mut LoginAttempt,
        live: &mut SecurityContext,
    ) -> Result<(), LoginError> {
        let scratch = match attempt.begin_commit() {
            Ok(scratch) => scratch,
            Err(e) => {
                if !attempt.is_terminal() {
                    attempt.fail();
                }
                return Err(LoginError::commit_failed(e));
            }
        };

        match self.coordinator.commit(attempt.shared_state(), &scratch, live) {
            Ok(()) => {
                attempt.committed();
                Ok(())
            }
            Err(e) => {
                attempt.fail();
                Err(e)
            }
        }
    }

    /// Establish and commit an identity in one step, without shared state.
    ///
    /// The whole scratch context is transferred into `live`.
    ///
    /// # Errors
    ///
    /// - `ElevationFailed` if the credentials service fails
    /// - `CommitFailed` if `live` already holds a different primary principal
    #[tracing::instrument(skip_all, fields(auth_method = %authentication_method))]
    pub fn commit_direct(
        &self,
        security_name: &str,
        access_id: &str,
        authentication_method: AuthenticationMethod,
        live: &mut SecurityContext,
    ) -> Result<(), LoginError> {
        let scratch = build_scratch_context(
            self.credentials.as_ref(),
            security_name,
            None,
            access_id,
            authentication_method,
        )
        .map_err(|e| log_and_convert("commit_direct", e))?;

        self.coordinator
            .commit_scratch(&scratch, live)
            .map_err(|e| log_and_convert("commit_direct", e))
    }
}

fn log_and_convert(op: &str, e: LoginError) -> LoginError {
    tracing::error!(operation = op, error = ?e, "login_commit call failed");
    e
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use login_commit_sdk::{CredentialsError, RegistryError, RegistryKind};
    use login_security::{PrimaryCredential, PrimaryPrincipal};
    use secrecy::SecretString;

    use super::*;
    use crate::domain::AttemptState;

    struct TestCredentials;

    impl CredentialsService for TestCredentials {
        fn set_credentials(&self, ctx: &mut SecurityContext) -> Result<(), CredentialsError> {
            let principal = ctx
                .primary_principal()
                .cloned()
                .ok_or(CredentialsError::MissingPrincipal)?;
            ctx.add_public_credential(PrimaryCredential::new(&principal, "test"));
            Ok(())
        }
    }

    struct NamingRegistry;

    impl UserRegistry for NamingRegistry {
        fn kind(&self) -> RegistryKind {
            RegistryKind::Ldap
        }

        fn realm(&self) -> &str {
            "test"
        }

        fn user_security_name(&self, confirmed_id: &str) -> Result<Option<String>, RegistryError> {
            Ok(Some(confirmed_id.to_uppercase()))
        }

        fn unique_user_id(&self, confirmed_id: &str) -> Result<String, RegistryError> {
            Ok(confirmed_id.to_owned())
        }

        fn check_password(
            &self,
            _user: &str,
            _password: &SecretString,
        ) -> Result<Option<String>, RegistryError> {
            Ok(None)
        }
    }

    fn service() -> LoginService {
        LoginService::new(&LoginCommitConfig::default(), Arc::new(TestCredentials))
    }

    fn identity(name: &str) -> VerifiedIdentity {
        VerifiedIdentity::new(name, format!("user:test/{name}"), AuthenticationMethod::Basic)
            .with_raw_identifier(name)
    }

    #[test]
    fn establish_aggregates_and_marks_processed() {
        let svc = service().with_registry(Arc::new(NamingRegistry));
        let mut attempt = LoginAttempt::new();

        svc.establish(&mut attempt, &identity("alice")).unwrap();

        assert_eq!(attempt.state(), AttemptState::Aggregated);
        assert!(attempt.shared_state().is_already_processed());
        assert_eq!(
            attempt.shared_state().principal().map(PrimaryPrincipal::security_name),
            Some("ALICE")
        );
    }

    #[test]
    fn commit_succeeds_once() {
        let svc = service();
        let mut attempt = LoginAttempt::new();
        let mut live = SecurityContext::new();
        svc.establish(&mut attempt, &identity("alice")).unwrap();

        svc.commit(&mut attempt, &mut live).unwrap();
        let err = svc.commit(&mut attempt, &mut live).unwrap_err();

        assert_eq!(attempt.state(), AttemptState::Committed);
        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert_eq!(live.primary_principals().count(), 1);
    }

    #[test]
    fn commit_without_identity_fails_attempt() {
        let svc = service();
        let mut attempt = LoginAttempt::new();
        let mut live = SecurityContext::new();

        let err = svc.commit(&mut attempt, &mut live).unwrap_err();

        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert_eq!(attempt.state(), AttemptState::Failed);
        assert!(live.is_empty());
    }

    #[test]
    fn establish_on_failed_attempt_is_rejected() {
        let svc = service();
        let mut attempt = LoginAttempt::new();
        let mut live = SecurityContext::new();
        let _err = svc.commit(&mut attempt, &mut live).unwrap_err();

        let err = svc.establish(&mut attempt, &identity("alice")).unwrap_err();

        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert!(attempt.shared_state().principal().is_none());
    }

    #[test]
    fn commit_direct_populates_live() {
        let svc = service();
        let mut live = SecurityContext::new();

        svc.commit_direct("alice", "user:test/alice", AuthenticationMethod::Token, &mut live)
            .unwrap();

        let principal = live.primary_principal().unwrap();
        assert_eq!(principal.security_name(), "alice");
        assert_eq!(principal.authentication_method(), AuthenticationMethod::Token);
        assert!(live.primary_credential().unwrap().belongs_to(principal));
    }

    #[test]
    fn new_service_has_no_steps() {
        assert!(service().step_names().is_empty());
    }
}
