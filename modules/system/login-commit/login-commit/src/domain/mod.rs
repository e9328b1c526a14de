//! Domain layer for the login commit protocol.

pub mod aggregate;
pub mod attempt;
pub mod commit;
pub mod resolver;
pub mod scratch;
pub mod service;

pub use aggregate::aggregate;
pub use attempt::{AttemptState, LoginAttempt};
pub use commit::CommitCoordinator;
pub use resolver::resolve_security_name;
pub use scratch::build_scratch_context;
pub use service::LoginService;
