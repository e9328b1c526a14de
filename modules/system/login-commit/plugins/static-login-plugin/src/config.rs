//! Configuration for the static login plugin.

use figment::Figment;
use figment::providers::{Format, Yaml};
use login_commit_sdk::RegistryKind;
use secrecy::SecretString;
use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticLoginPluginConfig {
    /// Realm used in access ids (`user:<realm>/<unique id>`).
    pub realm: String,

    /// Kind reported by the registry. `custom` keeps login names verbatim.
    pub registry_kind: RegistryKind,

    pub users: Vec<UserConfig>,

    /// Static token-to-user mappings accepted by the token step.
    pub tokens: Vec<TokenMapping>,

    /// Certificate subject-to-user mappings accepted by the certificate step.
    pub certificates: Vec<CertificateMapping>,

    pub credential: CredentialConfig,

    /// Lifetime of issued SSO tokens.
    pub sso_token_lifetime_secs: u64,
}

impl Default for StaticLoginPluginConfig {
    fn default() -> Self {
        Self {
            realm: "static".to_owned(),
            registry_kind: RegistryKind::Basic,
            users: Vec::new(),
            tokens: Vec::new(),
            certificates: Vec::new(),
            credential: CredentialConfig::default(),
            sso_token_lifetime_secs: 7200,
        }
    }
}

impl StaticLoginPluginConfig {
    /// Parse a YAML document on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(Figment::new().merge(Yaml::string(yaml)).extract()?)
    }
}

/// A registry user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Login name, also the registry-confirmed id.
    pub user_id: String,

    pub password: SecretString,

    /// Display name. Defaults to `user_id`.
    #[serde(default)]
    pub security_name: Option<String>,

    /// Id used to build the access id. Defaults to `user_id`.
    #[serde(default)]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub groups: Vec<String>,
}

/// Maps a static token to a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenMapping {
    pub token: SecretString,
    pub user_id: String,
}

/// Maps a client certificate subject DN to a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateMapping {
    pub subject_dn: String,
    pub user_id: String,
}

/// Primary credential issuance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialConfig {
    /// Whether primary credentials carry an expiration.
    pub expirable: bool,

    pub lifetime_secs: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            expirable: true,
            lifetime_secs: 43_200,
        }
    }
}
