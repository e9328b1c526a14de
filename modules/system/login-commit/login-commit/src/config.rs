//! Configuration for the login commit module.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides, e.g. `LOGIN_COMMIT_COMMIT_MODE=in_place`.
pub const ENV_PREFIX: &str = "LOGIN_COMMIT_";

/// How the commit transfer is applied to the live context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Apply the transfer to a staging copy and swap it into the live context
    /// only when every step succeeded. A failed commit leaves live untouched.
    #[default]
    Staged,
    /// Apply each step directly to the live context. A failure after the
    /// shared-state transfer leaves live partially updated.
    InPlace,
}

/// Configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoginCommitConfig {
    pub commit_mode: CommitMode,

    /// Let the SSO token's expiration override an expirable primary credential's.
    pub propagate_sso_expiration: bool,
}

impl Default for LoginCommitConfig {
    fn default() -> Self {
        Self {
            commit_mode: CommitMode::Staged,
            propagate_sso_expiration: true,
        }
    }
}

impl LoginCommitConfig {
    /// Load defaults, then the optional YAML file, then `LOGIN_COMMIT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let cfg = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        tracing::debug!(config = ?cfg, "Loaded login commit configuration");
        Ok(cfg)
    }

    /// Parse a YAML document on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::string(yaml))
            .extract()?)
    }
}
