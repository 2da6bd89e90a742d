// Inscription deployer library

// Enforce panic-free code in production
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), warn(clippy::panic))]
// Test-specific allows
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod artifact;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod explorer;
pub mod signer;

pub use config::DeployConfig;
pub use deploy::{Deployer, Deployment};
pub use error::DeployError;
