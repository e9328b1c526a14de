//! In-memory user registry built from plugin configuration.

use std::collections::{BTreeMap, HashMap};

use login_commit_sdk::{RegistryError, RegistryKind, UserRegistry};
use login_security::constants::user_access_id;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{StaticLoginPluginConfig, UserConfig};

#[derive(Debug)]
struct UserEntry {
    password: SecretString,
    security_name: Option<String>,
    unique_id: Option<String>,
    groups: Vec<String>,
}

/// Static user registry.
///
/// Users are keyed by login name, which doubles as the registry-confirmed id.
#[derive(Debug)]
pub struct StaticUserRegistry {
    kind: RegistryKind,
    realm: String,
    users: HashMap<String, UserEntry>,
    certificates: HashMap<String, String>,
}

impl StaticUserRegistry {
    #[must_use]
    pub fn from_config(cfg: &StaticLoginPluginConfig) -> Self {
        let users = cfg
            .users
            .iter()
            .map(|u: &UserConfig| {
                (
                    u.user_id.clone(),
                    UserEntry {
                        password: u.password.clone(),
                        security_name: u.security_name.clone(),
                        unique_id: u.unique_id.clone(),
                        groups: u.groups.clone(),
                    },
                )
            })
            .collect();
        let certificates = cfg
            .certificates
            .iter()
            .map(|m| (m.subject_dn.clone(), m.user_id.clone()))
            .collect();

        Self {
            kind: cfg.registry_kind,
            realm: cfg.realm.clone(),
            users,
            certificates,
        }
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Group memberships keyed by access id.
    #[must_use]
    pub fn groups_by_access_id(&self) -> BTreeMap<String, Vec<String>> {
        self.users
            .iter()
            .filter(|(_, u)| !u.groups.is_empty())
            .map(|(id, u)| {
                let unique = u.unique_id.as_deref().unwrap_or(id);
                (user_access_id(&self.realm, unique), u.groups.clone())
            })
            .collect()
    }

    fn entry(&self, user_id: &str) -> Result<&UserEntry, RegistryError> {
        self.users
            .get(user_id)
            .ok_or_else(|| RegistryError::EntryNotFound(user_id.to_owned()))
    }
}

impl UserRegistry for StaticUserRegistry {
    fn kind(&self) -> RegistryKind {
        self.kind
    }

    fn realm(&self) -> &str {
        &self.realm
    }

    fn user_security_name(&self, confirmed_id: &str) -> Result<Option<String>, RegistryError> {
        let entry = self.entry(confirmed_id)?;
        Ok(Some(
            entry
                .security_name
                .clone()
                .unwrap_or_else(|| confirmed_id.to_owned()),
        ))
    }

    fn unique_user_id(&self, confirmed_id: &str) -> Result<String, RegistryError> {
        let entry = self.entry(confirmed_id)?;
        Ok(entry
            .unique_id
            .clone()
            .unwrap_or_else(|| confirmed_id.to_owned()))
    }

    fn check_password(
        &self,
        user: &str,
        password: &SecretString,
    ) -> Result<Option<String>, RegistryError> {
        Ok(self
            .users
            .get(user)
            .filter(|u| u.password.expose_secret() == password.expose_secret())
            .map(|_| user.to_owned()))
    }

    fn map_certificate(&self, subject_dn: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.certificates.get(subject_dn).cloned())
    }
}
