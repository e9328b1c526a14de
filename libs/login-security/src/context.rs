use crate::credential::{PrimaryCredential, PrivateCredential, PublicCredential, SsoCredential};
use crate::principal::{Principal, PrimaryPrincipal};

/// `SecurityContext` is the ownership boundary for an authenticated subject.
///
/// It holds three unordered collections with set semantics: principals,
/// public credentials and private credentials. Adding an item equal to one
/// already present is a no-op.
///
/// The live context handed in by the login flow outlives a single attempt.
/// Scratch contexts built during an attempt are plain owned values and are
/// simply dropped when the attempt does not commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    principals: Vec<Principal>,
    public_credentials: Vec<PublicCredential>,
    private_credentials: Vec<PrivateCredential>,
}

impl SecurityContext {
    /// Create an empty `SecurityContext`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new `SecurityContext` builder
    #[must_use]
    pub fn builder() -> SecurityContextBuilder {
        SecurityContextBuilder::default()
    }

    #[must_use]
    pub fn principals(&self) -> &[Principal] {
        &self.principals
    }

    #[must_use]
    pub fn public_credentials(&self) -> &[PublicCredential] {
        &self.public_credentials
    }

    #[must_use]
    pub fn private_credentials(&self) -> &[PrivateCredential] {
        &self.private_credentials
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
            && self.public_credentials.is_empty()
            && self.private_credentials.is_empty()
    }

    /// First primary principal, if any.
    #[must_use]
    pub fn primary_principal(&self) -> Option<&PrimaryPrincipal> {
        self.primary_principals().next()
    }

    pub fn primary_principals(&self) -> impl Iterator<Item = &PrimaryPrincipal> {
        self.principals.iter().filter_map(Principal::as_primary)
    }

    /// First primary credential, if any.
    #[must_use]
    pub fn primary_credential(&self) -> Option<&PrimaryCredential> {
        self.public_credentials
            .iter()
            .find_map(PublicCredential::as_primary)
    }

    /// First SSO token held as a private credential, if any.
    #[must_use]
    pub fn sso_credential(&self) -> Option<&SsoCredential> {
        self.private_credentials
            .iter()
            .find_map(PrivateCredential::as_sso_token)
    }

    /// Look up `key` across all private attribute tables.
    #[must_use]
    pub fn private_attribute(&self, key: &str) -> Option<&str> {
        self.private_credentials
            .iter()
            .find_map(|c| c.attribute_value(key))
    }

    /// Add a principal. Returns `false` if an equal principal was already present.
    pub fn add_principal(&mut self, principal: impl Into<Principal>) -> bool {
        insert_unique(&mut self.principals, principal.into())
    }

    /// Add a public credential. Returns `false` if an equal one was already present.
    pub fn add_public_credential(&mut self, credential: impl Into<PublicCredential>) -> bool {
        insert_unique(&mut self.public_credentials, credential.into())
    }

    /// Add a private credential. Returns `false` if an equal one was already present.
    pub fn add_private_credential(&mut self, credential: impl Into<PrivateCredential>) -> bool {
        insert_unique(&mut self.private_credentials, credential.into())
    }

    /// Primary credential issued for `principal`, if any.
    pub fn primary_credential_for_mut(
        &mut self,
        principal: &PrimaryPrincipal,
    ) -> Option<&mut PrimaryCredential> {
        self.public_credentials.iter_mut().find_map(|c| match c {
            PublicCredential::Primary(p) if p.belongs_to(principal) => Some(p),
            PublicCredential::Primary(_) | PublicCredential::Attribute { .. } => None,
        })
    }

    /// Put `principal` in place of the primary principal with the same access
    /// id, or add it when there is none. Returns the replaced principal.
    pub fn replace_primary_principal(
        &mut self,
        principal: PrimaryPrincipal,
    ) -> Option<PrimaryPrincipal> {
        let slot = self.principals.iter_mut().find(|p| {
            p.as_primary()
                .is_some_and(|p| p.access_id() == principal.access_id())
        });
        match slot {
            Some(slot) => match std::mem::replace(slot, principal.into()) {
                Principal::Primary(old) => Some(old),
                Principal::Named(_) => None,
            },
            None => {
                self.principals.push(principal.into());
                None
            }
        }
    }

    /// Put `credential` in place of the primary credential with the same
    /// access id, or add it when there is none. Returns the replaced credential.
    pub fn replace_primary_credential(
        &mut self,
        credential: PrimaryCredential,
    ) -> Option<PrimaryCredential> {
        let slot = self.public_credentials.iter_mut().find(|c| {
            c.as_primary()
                .is_some_and(|c| c.access_id() == credential.access_id())
        });
        match slot {
            Some(slot) => match std::mem::replace(slot, credential.into()) {
                PublicCredential::Primary(old) => Some(old),
                PublicCredential::Attribute { .. } => None,
            },
            None => {
                self.public_credentials.push(credential.into());
                None
            }
        }
    }

    /// Drop every SSO token. Returns how many were removed.
    pub fn remove_sso_credentials(&mut self) -> usize {
        let before = self.private_credentials.len();
        self.private_credentials
            .retain(|c| !matches!(c, PrivateCredential::SsoToken(_)));
        before - self.private_credentials.len()
    }
}

fn insert_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        return false;
    }
    items.push(item);
    true
}

#[derive(Default)]
pub struct SecurityContextBuilder {
    ctx: SecurityContext,
}

impl SecurityContextBuilder {
    #[must_use]
    pub fn principal(mut self, principal: impl Into<Principal>) -> Self {
        self.ctx.add_principal(principal);
        self
    }

    #[must_use]
    pub fn public_credential(mut self, credential: impl Into<PublicCredential>) -> Self {
        self.ctx.add_public_credential(credential);
        self
    }

    #[must_use]
    pub fn private_credential(mut self, credential: impl Into<PrivateCredential>) -> Self {
        self.ctx.add_private_credential(credential);
        self
    }

    #[must_use]
    pub fn build(self) -> SecurityContext {
        self.ctx
    }
}
