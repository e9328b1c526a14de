use std::fmt;

use serde::{Deserialize, Serialize};

/// How the subject proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMethod {
    /// User name and password checked against the registry.
    Basic,
    /// Client certificate mapped by the registry.
    ClientCert,
    /// Previously issued SSO or bearer token.
    Token,
    /// Pre-established identity handed over as an attribute table.
    Hashtable,
}

impl AuthenticationMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::ClientCert => "client_cert",
            Self::Token => "token",
            Self::Hashtable => "hashtable",
        }
    }
}

impl fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical identity claim produced by a successful verification.
///
/// Immutable once constructed. A committed [`SecurityContext`](crate::SecurityContext)
/// holds at most one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryPrincipal {
    security_name: String,
    access_id: String,
    authentication_method: AuthenticationMethod,
}

impl PrimaryPrincipal {
    #[must_use]
    pub fn new(
        security_name: impl Into<String>,
        access_id: impl Into<String>,
        authentication_method: AuthenticationMethod,
    ) -> Self {
        Self {
            security_name: security_name.into(),
            access_id: access_id.into(),
            authentication_method,
        }
    }

    /// Display name resolved from the registry or the login identifier.
    #[must_use]
    pub fn security_name(&self) -> &str {
        &self.security_name
    }

    #[must_use]
    pub fn access_id(&self) -> &str {
        &self.access_id
    }

    #[must_use]
    pub fn authentication_method(&self) -> AuthenticationMethod {
        self.authentication_method
    }
}

impl fmt::Display for PrimaryPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.security_name, self.access_id)
    }
}

/// Auxiliary identity claim attached by a verification strategy
/// (e.g. a Kerberos name or a group membership).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedPrincipal {
    kind: String,
    name: String,
}

impl NamedPrincipal {
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Any identity claim held by a security context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    Primary(PrimaryPrincipal),
    Named(NamedPrincipal),
}

impl Principal {
    #[must_use]
    pub fn as_primary(&self) -> Option<&PrimaryPrincipal> {
        match self {
            Self::Primary(p) => Some(p),
            Self::Named(_) => None,
        }
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary(_))
    }
}

impl From<PrimaryPrincipal> for Principal {
    fn from(p: PrimaryPrincipal) -> Self {
        Self::Primary(p)
    }
}

impl From<NamedPrincipal> for Principal {
    fn from(p: NamedPrincipal) -> Self {
        Self::Named(p)
    }
}
