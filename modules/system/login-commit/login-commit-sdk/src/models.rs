//! Domain models for the login commit protocol.

use std::collections::BTreeMap;
use std::fmt;

use login_security::{
    AuthenticationMethod, Principal, PrimaryCredential, PrimaryPrincipal, PrivateCredential,
    PublicCredential, SecurityContext, SsoCredential,
};
use secrecy::SecretString;
use serde::Deserialize;

/// Kind of the backing user registry.
///
/// `Custom` registries apply their own name normalization, which the
/// identity resolver does not second-guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    #[default]
    Basic,
    Ldap,
    Saf,
    Custom,
}

impl RegistryKind {
    #[must_use]
    pub fn is_custom(self) -> bool {
        matches!(self, Self::Custom)
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Ldap => "ldap",
            Self::Saf => "saf",
            Self::Custom => "custom",
        })
    }
}

/// Well-known keys of a pre-established identity table.
pub mod hashtable_keys {
    /// Registry-confirmed user id. Required.
    pub const USER_ID: &str = "login.user_id";

    /// Display security name. Used verbatim when the registry gives none.
    pub const SECURITY_NAME: &str = "login.security_name";

    /// Unique user id used to build the access id.
    pub const UNIQUE_ID: &str = "login.unique_id";
}

/// The credential presented to a login attempt.
#[derive(Debug, Clone)]
pub enum LoginRequest {
    Password {
        user: String,
        password: SecretString,
    },
    Token(SecretString),
    Certificate {
        subject_dn: String,
    },
    Hashtable(BTreeMap<String, String>),
}

/// Identity established by a successful verification step.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Identifier as supplied by the caller (login name), if any.
    pub raw_identifier: Option<String>,
    /// Identifier the registry confirmed during the credential check.
    pub registry_confirmed_id: String,
    pub access_id: String,
    pub authentication_method: AuthenticationMethod,
    /// Auxiliary material the strategy attaches beyond the canonical triple.
    pub extra_principals: Vec<Principal>,
    pub extra_public_credentials: Vec<PublicCredential>,
    pub extra_private_credentials: Vec<PrivateCredential>,
}

impl VerifiedIdentity {
    #[must_use]
    pub fn new(
        registry_confirmed_id: impl Into<String>,
        access_id: impl Into<String>,
        authentication_method: AuthenticationMethod,
    ) -> Self {
        Self {
            raw_identifier: None,
            registry_confirmed_id: registry_confirmed_id.into(),
            access_id: access_id.into(),
            authentication_method,
            extra_principals: Vec::new(),
            extra_public_credentials: Vec::new(),
            extra_private_credentials: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_raw_identifier(mut self, raw_identifier: impl Into<String>) -> Self {
        self.raw_identifier = Some(raw_identifier.into());
        self
    }

    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<Principal>) -> Self {
        self.extra_principals.push(principal.into());
        self
    }

    #[must_use]
    pub fn with_public_credential(mut self, credential: impl Into<PublicCredential>) -> Self {
        self.extra_public_credentials.push(credential.into());
        self
    }

    #[must_use]
    pub fn with_private_credential(mut self, credential: impl Into<PrivateCredential>) -> Self {
        self.extra_private_credentials.push(credential.into());
        self
    }

    /// Attach the auxiliary material to `ctx`.
    pub fn attach_extras(&self, ctx: &mut SecurityContext) {
        for p in &self.extra_principals {
            ctx.add_principal(p.clone());
        }
        for c in &self.extra_public_credentials {
            ctx.add_public_credential(c.clone());
        }
        for c in &self.extra_private_credentials {
            ctx.add_private_credential(c.clone());
        }
    }
}

/// Result of a single verification step.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The credential checked out; the identity should be established.
    Verified(VerifiedIdentity),
    /// The step does not handle this request or the check did not pass.
    Declined,
}

/// Closed set of shared-state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedStateKey {
    Principal,
    Credential,
    SsoToken,
    AlreadyProcessed,
}

impl fmt::Display for SharedStateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Principal => "principal",
            Self::Credential => "credential",
            Self::SsoToken => "sso_token",
            Self::AlreadyProcessed => "already_processed",
        })
    }
}

/// State shared by all verification steps of one login attempt.
///
/// Identity entries are first-writer-wins: once set they are never replaced.
/// Never shared across attempts.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    principal: Option<PrimaryPrincipal>,
    credential: Option<PrimaryCredential>,
    sso_token: Option<SsoCredential>,
    already_processed: bool,
}

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn principal(&self) -> Option<&PrimaryPrincipal> {
        self.principal.as_ref()
    }

    #[must_use]
    pub fn credential(&self) -> Option<&PrimaryCredential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn sso_token(&self) -> Option<&SsoCredential> {
        self.sso_token.as_ref()
    }

    #[must_use]
    pub fn is_already_processed(&self) -> bool {
        self.already_processed
    }

    pub fn mark_already_processed(&mut self) {
        self.already_processed = true;
    }

    #[must_use]
    pub fn contains(&self, key: SharedStateKey) -> bool {
        match key {
            SharedStateKey::Principal => self.principal.is_some(),
            SharedStateKey::Credential => self.credential.is_some(),
            SharedStateKey::SsoToken => self.sso_token.is_some(),
            SharedStateKey::AlreadyProcessed => self.already_processed,
        }
    }

    /// Set the principal unless one is already present. Returns whether it was stored.
    pub fn offer_principal(&mut self, principal: &PrimaryPrincipal) -> bool {
        offer(&mut self.principal, principal)
    }

    /// Set the credential unless one is already present. Returns whether it was stored.
    pub fn offer_credential(&mut self, credential: &PrimaryCredential) -> bool {
        offer(&mut self.credential, credential)
    }

    /// Set the SSO token unless one is already present. Returns whether it was stored.
    pub fn offer_sso_token(&mut self, token: &SsoCredential) -> bool {
        offer(&mut self.sso_token, token)
    }
}

fn offer<T: Clone>(slot: &mut Option<T>, value: &T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value.clone());
    true
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn principal(name: &str) -> PrimaryPrincipal {
        PrimaryPrincipal::new(name, format!("user:basic/{name}"), AuthenticationMethod::Basic)
    }

    #[test]
    fn shared_state_entries_are_first_writer_wins() {
        let mut state = SharedState::new();

        assert!(state.offer_principal(&principal("alice")));
        assert!(!state.offer_principal(&principal("bob")));

        let sso_a = SsoCredential::new("a".to_owned(), datetime!(2030-01-01 0:00 UTC));
        let sso_b = SsoCredential::new("b".to_owned(), datetime!(2030-01-01 0:00 UTC));
        assert!(state.offer_sso_token(&sso_a));
        assert!(!state.offer_sso_token(&sso_b));

        assert_eq!(state.principal().map(PrimaryPrincipal::security_name), Some("alice"));
        assert_eq!(state.sso_token(), Some(&sso_a));
    }

    #[test]
    fn contains_reports_each_key() {
        let mut state = SharedState::new();
        assert!(!state.contains(SharedStateKey::Principal));
        assert!(!state.contains(SharedStateKey::AlreadyProcessed));

        state.offer_credential(&PrimaryCredential::new(&principal("alice"), "basic"));
        state.mark_already_processed();

        assert!(state.contains(SharedStateKey::Credential));
        assert!(state.contains(SharedStateKey::AlreadyProcessed));
        assert!(!state.contains(SharedStateKey::SsoToken));
        assert!(state.is_already_processed());
    }

    #[test]
    fn registry_kind_deserializes_snake_case() {
        let kind: RegistryKind = serde_json::from_str("\"custom\"").unwrap();
        assert!(kind.is_custom());
        assert!(!RegistryKind::Ldap.is_custom());
    }

    #[test]
    fn verified_identity_attaches_extras() {
        let identity = VerifiedIdentity::new("alice", "user:basic/alice", AuthenticationMethod::Basic)
            .with_principal(login_security::NamedPrincipal::new("group", "admins"))
            .with_public_credential(PublicCredential::attribute("locale", "en"))
            .with_private_credential(PrivateCredential::attribute("k", "v"));

        let mut ctx = SecurityContext::new();
        identity.attach_extras(&mut ctx);

        assert_eq!(ctx.principals().len(), 1);
        assert_eq!(ctx.public_credentials().len(), 1);
        assert_eq!(ctx.private_attribute("k"), Some("v"));
    }
}
