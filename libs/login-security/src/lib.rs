#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod constants;
pub mod context;
pub mod credential;
pub mod principal;
pub mod privileged;

pub use context::{SecurityContext, SecurityContextBuilder};
pub use credential::{PrimaryCredential, PrivateCredential, PublicCredential, SsoCredential};
pub use principal::{AuthenticationMethod, NamedPrincipal, Principal, PrimaryPrincipal};
pub use privileged::{BoxError, ElevationError, is_elevated, run_elevated};
