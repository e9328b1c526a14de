//! Static login plugin.
//!
//! Provides a configuration-driven user registry, credentials service and
//! SSO token issuer together with the password, certificate, token and
//! hashtable verification steps. Intended for development and tests.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod module;

pub use config::StaticLoginPluginConfig;
pub use module::StaticLoginPlugin;
