pub mod installer;
pub mod npm_client;

pub use installer::{DependencyInstaller, dependency_spec};
pub use npm_client::{InstallOutcome, NpmRegistryClient};
