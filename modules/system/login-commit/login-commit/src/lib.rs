//! Login Commit Module
//!
//! After a verification step accepts a credential, this module resolves the
//! canonical security name, builds an isolated scratch context, aggregates the
//! canonical principal and credentials into the attempt's shared state and,
//! exactly once per successful attempt, commits them into the caller's live
//! `SecurityContext`.
//!
//! The entry point is [`LoginService`](domain::LoginService).
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::{CommitMode, LoginCommitConfig};
pub use domain::{AttemptState, CommitCoordinator, LoginAttempt, LoginService};
