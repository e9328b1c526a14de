pub mod credentials;
pub mod registry;
pub mod steps;

pub use credentials::{StaticCredentialsService, StaticTokenIssuer};
pub use registry::StaticUserRegistry;
pub use steps::{CertificateStep, HashtableStep, PasswordStep, TokenStep};
