//! Shared-state aggregation.

use login_commit_sdk::{SharedState, SsoTokenLookup};
use login_security::SecurityContext;
use tracing::debug;

/// Copy the canonical principal, primary credential and SSO token of `scratch`
/// into `shared`, skipping any entry an earlier step already set.
///
/// Idempotent: the first step that establishes an identity owns it for the
/// whole attempt. A scratch context for another access id fills no entry.
pub fn aggregate(scratch: &SecurityContext, shared: &mut SharedState, sso: &dyn SsoTokenLookup) {
    let Some(scratch_principal) = scratch.primary_principal() else {
        debug!("Scratch context has no primary principal, nothing aggregated");
        return;
    };
    let principal = shared.offer_principal(scratch_principal);
    if shared
        .principal()
        .is_some_and(|p| p.access_id() != scratch_principal.access_id())
    {
        debug!(
            access_id = scratch_principal.access_id(),
            "Scratch context belongs to another identity, nothing aggregated"
        );
        return;
    }

    let credential = scratch
        .primary_credential()
        .is_some_and(|c| shared.offer_credential(c));
    let sso_token = sso
        .sso_token(scratch)
        .is_some_and(|t| shared.offer_sso_token(t));

    debug!(principal, credential, sso_token, "Aggregated scratch context into shared state");
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use login_commit_sdk::{FirstSsoTokenLookup, SharedStateKey};
    use login_security::{
        AuthenticationMethod, PrimaryCredential, PrimaryPrincipal, SsoCredential,
    };
    use time::macros::datetime;

    use super::*;

    fn scratch(name: &str, sso: Option<&str>) -> SecurityContext {
        let principal =
            PrimaryPrincipal::new(name, format!("user:test/{name}"), AuthenticationMethod::Basic);
        let mut ctx = SecurityContext::builder()
            .principal(principal.clone())
            .public_credential(PrimaryCredential::new(&principal, "test"))
            .build();
        if let Some(token) = sso {
            ctx.add_private_credential(SsoCredential::new(
                token.to_owned(),
                datetime!(2030-01-01 0:00 UTC),
            ));
        }
        ctx
    }

    #[test]
    fn first_aggregation_wins() {
        let mut shared = SharedState::new();

        aggregate(&scratch("alice", Some("sso-a")), &mut shared, &FirstSsoTokenLookup);
        aggregate(&scratch("bob", Some("sso-b")), &mut shared, &FirstSsoTokenLookup);

        assert_eq!(shared.principal().map(PrimaryPrincipal::security_name), Some("alice"));
        assert_eq!(shared.credential().map(PrimaryCredential::access_id), Some("user:test/alice"));
        assert_eq!(
            shared.sso_token(),
            Some(&SsoCredential::new("sso-a".to_owned(), datetime!(2030-01-01 0:00 UTC)))
        );
    }

    #[test]
    fn later_step_for_same_identity_fills_missing_entries() {
        let mut shared = SharedState::new();

        aggregate(&scratch("alice", None), &mut shared, &FirstSsoTokenLookup);
        assert!(!shared.contains(SharedStateKey::SsoToken));

        aggregate(&scratch("alice", Some("sso-a")), &mut shared, &FirstSsoTokenLookup);

        assert_eq!(shared.principal().map(PrimaryPrincipal::security_name), Some("alice"));
        assert!(shared.contains(SharedStateKey::SsoToken));
    }

    #[test]
    fn other_identity_never_fills_missing_entries() {
        let mut shared = SharedState::new();
        shared.offer_principal(&PrimaryPrincipal::new(
            "alice",
            "user:test/alice",
            AuthenticationMethod::Basic,
        ));

        aggregate(&scratch("bob", Some("sso-b")), &mut shared, &FirstSsoTokenLookup);

        assert_eq!(shared.principal().map(PrimaryPrincipal::security_name), Some("alice"));
        assert!(shared.credential().is_none());
        assert!(shared.sso_token().is_none());
    }

    #[test]
    fn repeated_aggregation_is_idempotent() {
        let mut shared = SharedState::new();
        let ctx = scratch("alice", Some("sso-a"));

        aggregate(&ctx, &mut shared, &FirstSsoTokenLookup);
        let before = format!("{shared:?}");
        aggregate(&ctx, &mut shared, &FirstSsoTokenLookup);

        assert_eq!(format!("{shared:?}"), before);
    }

    #[test]
    fn empty_scratch_sets_nothing() {
        let mut shared = SharedState::new();

        aggregate(&SecurityContext::new(), &mut shared, &FirstSsoTokenLookup);

        assert!(shared.principal().is_none());
        assert!(shared.credential().is_none());
        assert!(shared.sso_token().is_none());
    }
}
