//! Transfer of an attempt's results into the live security context.

use std::sync::Arc;

use login_commit_sdk::{CommitError, LoginError, SharedState, SharedStateKey, SsoTokenLookup};
use login_security::{PrimaryPrincipal, SecurityContext, SsoCredential, run_elevated};
use tracing::{debug, info, warn};

use crate::config::{CommitMode, LoginCommitConfig};

/// Performs the single transfer of an attempt into the live context.
///
/// The transfer runs in an elevation scope and, in [`CommitMode::Staged`],
/// is applied to a copy of the live context that replaces it only when every
/// step succeeded.
pub struct CommitCoordinator {
    mode: CommitMode,
    propagate_sso_expiration: bool,
    sso: Arc<dyn SsoTokenLookup>,
}

impl CommitCoordinator {
    #[must_use]
    pub fn new(config: &LoginCommitConfig, sso: Arc<dyn SsoTokenLookup>) -> Self {
        Self {
            mode: config.commit_mode,
            propagate_sso_expiration: config.propagate_sso_expiration,
            sso,
        }
    }

    /// Commit the shared-state identity plus the remaining scratch contents into `live`.
    ///
    /// 1. shared principal, credential and SSO token
    /// 2. every other scratch principal and credential
    /// 3. SSO expiration onto the committed principal's expirable credential
    ///
    /// A `live` context already holding the same access id is refreshed: its
    /// primary principal and credential are replaced, and so is its SSO token
    /// when the attempt carries one.
    ///
    /// # Errors
    ///
    /// - `CommitFailed` if the shared state lacks the principal or credential,
    ///   or `live` already holds a different primary principal
    #[tracing::instrument(skip_all, fields(mode = ?self.mode))]
    pub fn commit(
        &self,
        shared: &SharedState,
        scratch: &SecurityContext,
        live: &mut SecurityContext,
    ) -> Result<(), LoginError> {
        self.apply(live, |target| {
            let principal = transfer_shared_state(shared, target)?;
            self.transfer_scratch_remainder(scratch, target);
            self.propagate_expiration(target, principal);
            Ok(())
        })?;

        info!(
            principal = shared.principal().map(PrimaryPrincipal::access_id),
            sso_token = shared.sso_token().is_some(),
            "Committed login attempt"
        );
        Ok(())
    }

    /// Commit every item of `scratch` into `live` without going through shared state.
    ///
    /// # Errors
    ///
    /// - `CommitFailed` if `scratch` has no primary principal or `live` already
    ///   holds a different one
    #[tracing::instrument(skip_all, fields(mode = ?self.mode))]
    pub fn commit_scratch(
        &self,
        scratch: &SecurityContext,
        live: &mut SecurityContext,
    ) -> Result<(), LoginError> {
        self.apply(live, |target| {
            let principal = scratch
                .primary_principal()
                .ok_or(CommitError::MissingSharedEntry(SharedStateKey::Principal))?;
            let refreshed = install_principal(target, principal)?;

            for p in scratch.principals().iter().filter(|p| !p.is_primary()) {
                target.add_principal(p.clone());
            }
            for c in scratch.public_credentials() {
                if let Some(primary) = c.as_primary() {
                    target.replace_primary_credential(primary.clone());
                } else {
                    target.add_public_credential(c.clone());
                }
            }
            if refreshed && scratch.sso_credential().is_some() {
                target.remove_sso_credentials();
            }
            for c in scratch.private_credentials() {
                target.add_private_credential(c.clone());
            }
            Ok(())
        })?;

        debug!("Committed scratch context");
        Ok(())
    }

    fn apply<F>(&self, live: &mut SecurityContext, transfer: F) -> Result<(), LoginError>
    where
        F: FnOnce(&mut SecurityContext) -> Result<(), CommitError>,
    {
        run_elevated(|| match self.mode {
            CommitMode::Staged => {
                let mut staged = live.clone();
                transfer(&mut staged)?;
                *live = staged;
                Ok::<_, CommitError>(())
            }
            CommitMode::InPlace => transfer(live),
        })
        .map_err(|e| {
            warn!(error = %e, "Commit aborted");
            LoginError::commit_failed(e)
        })
    }

    /// Items already carried by the shared state are excluded: all primary
    /// principals, all primary credentials and the scratch SSO token.
    fn transfer_scratch_remainder(&self, scratch: &SecurityContext, target: &mut SecurityContext) {
        for p in scratch.principals().iter().filter(|p| !p.is_primary()) {
            target.add_principal(p.clone());
        }
        for c in scratch.public_credentials().iter().filter(|c| !c.is_primary()) {
            target.add_public_credential(c.clone());
        }

        let scratch_sso = self.sso.sso_token(scratch);
        for c in scratch
            .private_credentials()
            .iter()
            .filter(|c| scratch_sso.is_none() || c.as_sso_token() != scratch_sso)
        {
            target.add_private_credential(c.clone());
        }
    }

    fn propagate_expiration(&self, target: &mut SecurityContext, principal: &PrimaryPrincipal) {
        if !self.propagate_sso_expiration {
            return;
        }
        let Some(expiration) = self.sso.sso_token(target).map(SsoCredential::expiration) else {
            return;
        };
        if let Some(credential) = target.primary_credential_for_mut(principal)
            && credential.set_expiration(expiration)
        {
            debug!(%expiration, "Primary credential expiration taken from SSO token");
        }
    }
}

fn transfer_shared_state<'a>(
    shared: &'a SharedState,
    target: &mut SecurityContext,
) -> Result<&'a PrimaryPrincipal, CommitError> {
    let principal = shared
        .principal()
        .ok_or(CommitError::MissingSharedEntry(SharedStateKey::Principal))?;
    let refreshed = install_principal(target, principal)?;

    let credential = shared
        .credential()
        .ok_or(CommitError::MissingSharedEntry(SharedStateKey::Credential))?;
    target.replace_primary_credential(credential.clone());

    if let Some(token) = shared.sso_token() {
        if refreshed {
            target.remove_sso_credentials();
        }
        target.add_private_credential(token.clone());
    }
    Ok(principal)
}

/// Returns `true` when `target` already held `principal`'s access id.
fn install_principal(
    target: &mut SecurityContext,
    principal: &PrimaryPrincipal,
) -> Result<bool, CommitError> {
    ensure_single_primary(target, principal.access_id())?;
    let refreshed = target.replace_primary_principal(principal.clone()).is_some();
    if refreshed {
        debug!(access_id = principal.access_id(), "Refreshing identity already in live context");
    }
    Ok(refreshed)
}

fn ensure_single_primary(target: &SecurityContext, incoming: &str) -> Result<(), CommitError> {
    match target.primary_principal() {
        Some(existing) if existing.access_id() != incoming => Err(CommitError::PrincipalConflict {
            existing: existing.access_id().to_owned(),
            incoming: incoming.to_owned(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use login_commit_sdk::FirstSsoTokenLookup;
    use login_security::{
        AuthenticationMethod, NamedPrincipal, PrimaryCredential, PrimaryPrincipal,
        PrivateCredential, PublicCredential, is_elevated,
    };
    use time::OffsetDateTime;
    use time::macros::datetime;

    use super::*;
    use crate::domain::aggregate;

    const T1: OffsetDateTime = datetime!(2030-01-01 0:00 UTC);
    const T2: OffsetDateTime = datetime!(2026-10-18 20:00 UTC);

    fn alice() -> PrimaryPrincipal {
        PrimaryPrincipal::new("alice", "user:test/alice", AuthenticationMethod::Basic)
    }

    fn coordinator(mode: CommitMode) -> CommitCoordinator {
        let cfg = LoginCommitConfig {
            commit_mode: mode,
            ..LoginCommitConfig::default()
        };
        CommitCoordinator::new(&cfg, Arc::new(FirstSsoTokenLookup))
    }

    fn sso() -> SsoCredential {
        SsoCredential::new("sso-token".to_owned(), T2)
    }

    /// Scratch with an expirable credential, an SSO token and auxiliary items.
    fn full_scratch() -> SecurityContext {
        SecurityContext::builder()
            .principal(alice())
            .principal(NamedPrincipal::new("group", "admins"))
            .public_credential(PrimaryCredential::expirable(&alice(), "test", T1))
            .public_credential(PublicCredential::attribute("locale", "en"))
            .private_credential(sso())
            .private_credential(PrivateCredential::attribute("kerberos", "ticket"))
            .build()
    }

    fn shared_from(scratch: &SecurityContext) -> SharedState {
        let mut shared = SharedState::new();
        aggregate(scratch, &mut shared, &FirstSsoTokenLookup);
        shared
    }

    #[test]
    fn commit_transfers_canonical_triple_and_auxiliary_items() {
        let scratch = full_scratch();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        assert_eq!(live.primary_principals().count(), 1);
        assert_eq!(live.primary_principal(), Some(&alice()));
        assert!(live.primary_credential().is_some());
        assert_eq!(live.sso_credential(), Some(&sso()));
        assert!(live.principals().contains(&NamedPrincipal::new("group", "admins").into()));
        assert!(live.public_credentials().contains(&PublicCredential::attribute("locale", "en")));
        assert_eq!(live.private_attribute("kerberos"), Some("ticket"));
    }

    #[test]
    fn commit_does_not_duplicate_shared_items() {
        let scratch = full_scratch();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        assert_eq!(live.principals().len(), 2);
        assert_eq!(live.public_credentials().len(), 2);
        assert_eq!(live.private_credentials().len(), 2);
        assert_eq!(
            live.private_credentials()
                .iter()
                .filter(|c| c.as_sso_token().is_some())
                .count(),
            1
        );
    }

    #[test]
    fn sso_expiration_replaces_expirable_credential_expiration() {
        let scratch = full_scratch();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        assert_eq!(
            live.primary_credential().and_then(PrimaryCredential::expiration),
            Some(T2)
        );
    }

    #[test]
    fn non_expirable_credential_is_left_alone() {
        let scratch = SecurityContext::builder()
            .principal(alice())
            .public_credential(PrimaryCredential::new(&alice(), "test"))
            .private_credential(sso())
            .build();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        let credential = live.primary_credential().unwrap();
        assert!(!credential.is_expirable());
        assert_eq!(credential.expiration(), None);
    }

    #[test]
    fn expiration_kept_without_sso_token() {
        let scratch = SecurityContext::builder()
            .principal(alice())
            .public_credential(PrimaryCredential::expirable(&alice(), "test", T1))
            .build();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        assert_eq!(
            live.primary_credential().and_then(PrimaryCredential::expiration),
            Some(T1)
        );
    }

    #[test]
    fn propagation_can_be_disabled() {
        let cfg = LoginCommitConfig {
            propagate_sso_expiration: false,
            ..LoginCommitConfig::default()
        };
        let coordinator = CommitCoordinator::new(&cfg, Arc::new(FirstSsoTokenLookup));
        let scratch = full_scratch();
        let shared = shared_from(&scratch);
        let mut live = SecurityContext::new();

        coordinator.commit(&shared, &scratch, &mut live).unwrap();

        assert_eq!(
            live.primary_credential().and_then(PrimaryCredential::expiration),
            Some(T1)
        );
    }

    #[test]
    fn staged_failure_leaves_live_untouched() {
        let scratch = full_scratch();
        let mut shared = SharedState::new();
        shared.offer_principal(&alice());
        let mut live = SecurityContext::builder()
            .public_credential(PublicCredential::attribute("pre", "existing"))
            .build();
        let before = live.clone();

        let err = coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap_err();

        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert_eq!(
            err.commit_cause(),
            Some(&CommitError::MissingSharedEntry(SharedStateKey::Credential))
        );
        assert_eq!(live, before);
        assert!(!is_elevated());
    }

    #[test]
    fn in_place_failure_leaves_partial_update() {
        let scratch = full_scratch();
        let mut shared = SharedState::new();
        shared.offer_principal(&alice());
        let mut live = SecurityContext::new();

        let err = coordinator(CommitMode::InPlace)
            .commit(&shared, &scratch, &mut live)
            .unwrap_err();

        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert_eq!(live.primary_principal(), Some(&alice()));
        assert!(live.primary_credential().is_none());
    }

    #[test]
    fn conflicting_primary_principal_is_refused() {
        let bob = PrimaryPrincipal::new("bob", "user:test/bob", AuthenticationMethod::Basic);
        let mut live = SecurityContext::builder().principal(bob).build();
        let scratch = full_scratch();
        let shared = shared_from(&scratch);

        let err = coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap_err();

        assert!(matches!(
            err.commit_cause(),
            Some(CommitError::PrincipalConflict { existing, incoming })
                if existing == "user:test/bob" && incoming == "user:test/alice"
        ));
        assert_eq!(live.primary_principals().count(), 1);
    }

    #[test]
    fn recommitting_same_principal_keeps_one() {
        let mut live = SecurityContext::builder().principal(alice()).build();
        let scratch = full_scratch();
        let shared = shared_from(&scratch);

        coordinator(CommitMode::Staged)
            .commit(&shared, &scratch, &mut live)
            .unwrap();

        assert_eq!(live.primary_principals().count(), 1);
    }

    #[test]
    fn recommitting_same_access_id_refreshes_identity() {
        let coordinator = coordinator(CommitMode::Staged);
        let scratch = full_scratch();
        let mut live = SecurityContext::new();
        coordinator
            .commit(&shared_from(&scratch), &scratch, &mut live)
            .unwrap();

        let by_token =
            PrimaryPrincipal::new("alice", "user:test/alice", AuthenticationMethod::Token);
        let later = datetime!(2026-10-19 6:00 UTC);
        let scratch = SecurityContext::builder()
            .principal(by_token.clone())
            .public_credential(PrimaryCredential::expirable(&by_token, "test", T1))
            .private_credential(SsoCredential::new("sso-token-2".to_owned(), later))
            .build();
        coordinator
            .commit(&shared_from(&scratch), &scratch, &mut live)
            .unwrap();

        assert_eq!(live.primary_principals().count(), 1);
        assert_eq!(live.primary_principal(), Some(&by_token));
        let expirations: Vec<_> = live
            .public_credentials()
            .iter()
            .filter_map(PublicCredential::as_primary)
            .map(PrimaryCredential::expiration)
            .collect();
        assert_eq!(expirations, [Some(later)]);
        assert_eq!(live.sso_credential().map(SsoCredential::expiration), Some(later));
        assert_eq!(
            live.private_credentials()
                .iter()
                .filter(|c| c.as_sso_token().is_some())
                .count(),
            1
        );
        assert!(live.principals().contains(&NamedPrincipal::new("group", "admins").into()));
    }

    #[test]
    fn commit_scratch_refreshes_same_access_id() {
        let coordinator = coordinator(CommitMode::InPlace);
        let mut live = SecurityContext::new();
        coordinator.commit_scratch(&full_scratch(), &mut live).unwrap();

        let by_token =
            PrimaryPrincipal::new("alice", "user:test/alice", AuthenticationMethod::Token);
        let scratch = SecurityContext::builder()
            .principal(by_token.clone())
            .public_credential(PrimaryCredential::new(&by_token, "test"))
            .build();
        coordinator.commit_scratch(&scratch, &mut live).unwrap();

        assert_eq!(live.primary_principals().count(), 1);
        assert_eq!(live.primary_principal(), Some(&by_token));
        assert_eq!(
            live.public_credentials()
                .iter()
                .filter_map(PublicCredential::as_primary)
                .count(),
            1
        );
        assert_eq!(live.sso_credential(), Some(&sso()));
    }

    #[test]
    fn commit_scratch_transfers_everything() {
        let mut live = SecurityContext::new();

        coordinator(CommitMode::Staged)
            .commit_scratch(&full_scratch(), &mut live)
            .unwrap();

        assert_eq!(live, full_scratch());
    }

    #[test]
    fn commit_scratch_requires_primary_principal() {
        let mut live = SecurityContext::new();

        let err = coordinator(CommitMode::Staged)
            .commit_scratch(&SecurityContext::new(), &mut live)
            .unwrap_err();

        assert!(matches!(err, LoginError::CommitFailed(_)));
        assert!(live.is_empty());
    }
}
