//! Credential objects carried by a [`SecurityContext`](crate::SecurityContext).
//!
//! Public credentials are non-secret attributes (the primary credential, plain
//! name/value attributes). Private credentials hold secret-bearing material
//! (SSO tokens) and attribute tables kept out of the public view.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::principal::PrimaryPrincipal;

/// Credential correlated 1:1 with a resolved [`PrimaryPrincipal`].
///
/// `expiration` is present only when the credential is expirable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryCredential {
    security_name: String,
    access_id: String,
    realm: String,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    expiration: Option<OffsetDateTime>,
}

impl PrimaryCredential {
    /// Credential that never expires.
    #[must_use]
    pub fn new(principal: &PrimaryPrincipal, realm: impl Into<String>) -> Self {
        Self {
            security_name: principal.security_name().to_owned(),
            access_id: principal.access_id().to_owned(),
            realm: realm.into(),
            groups: Vec::new(),
            expiration: None,
        }
    }

    /// Expirable credential valid until `expiration`.
    #[must_use]
    pub fn expirable(
        principal: &PrimaryPrincipal,
        realm: impl Into<String>,
        expiration: OffsetDateTime,
    ) -> Self {
        Self {
            expiration: Some(expiration),
            ..Self::new(principal, realm)
        }
    }

    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn security_name(&self) -> &str {
        &self.security_name
    }

    #[must_use]
    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub fn is_expirable(&self) -> bool {
        self.expiration.is_some()
    }

    #[must_use]
    pub fn expiration(&self) -> Option<OffsetDateTime> {
        self.expiration
    }

    /// Replace the expiration of an expirable credential.
    ///
    /// Returns `false` and leaves the credential untouched when it is not expirable.
    pub fn set_expiration(&mut self, expiration: OffsetDateTime) -> bool {
        match &mut self.expiration {
            Some(current) => {
                *current = expiration;
                true
            }
            None => false,
        }
    }

    /// Whether this credential was issued for `principal`.
    #[must_use]
    pub fn belongs_to(&self, principal: &PrimaryPrincipal) -> bool {
        self.access_id == principal.access_id()
    }
}

/// Reusable single-sign-on session token.
///
/// The token value is redacted from `Debug` output.
#[derive(Debug, Clone)]
pub struct SsoCredential {
    token: SecretString,
    expiration: OffsetDateTime,
}

impl SsoCredential {
    #[must_use]
    pub fn new(token: impl Into<SecretString>, expiration: OffsetDateTime) -> Self {
        Self {
            token: token.into(),
            expiration,
        }
    }

    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    #[must_use]
    pub fn expiration(&self) -> OffsetDateTime {
        self.expiration
    }
}

impl PartialEq for SsoCredential {
    fn eq(&self, other: &Self) -> bool {
        self.expiration == other.expiration
            && self.token.expose_secret() == other.token.expose_secret()
    }
}

impl Eq for SsoCredential {}

/// Non-secret credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicCredential {
    Primary(PrimaryCredential),
    Attribute { name: String, value: String },
}

impl PublicCredential {
    #[must_use]
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn as_primary(&self) -> Option<&PrimaryCredential> {
        match self {
            Self::Primary(c) => Some(c),
            Self::Attribute { .. } => None,
        }
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary(_))
    }
}

impl From<PrimaryCredential> for PublicCredential {
    fn from(c: PrimaryCredential) -> Self {
        Self::Primary(c)
    }
}

/// Secret-bearing credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateCredential {
    SsoToken(SsoCredential),
    Attributes(BTreeMap<String, String>),
}

impl PrivateCredential {
    /// Single-entry attribute table.
    #[must_use]
    pub fn attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attributes(BTreeMap::from([(key.into(), value.into())]))
    }

    #[must_use]
    pub fn as_sso_token(&self) -> Option<&SsoCredential> {
        match self {
            Self::SsoToken(t) => Some(t),
            Self::Attributes(_) => None,
        }
    }

    #[must_use]
    pub fn attribute_value(&self, key: &str) -> Option<&str> {
        match self {
            Self::Attributes(map) => map.get(key).map(String::as_str),
            Self::SsoToken(_) => None,
        }
    }
}

impl From<SsoCredential> for PrivateCredential {
    fn from(t: SsoCredential) -> Self {
        Self::SsoToken(t)
    }
}
