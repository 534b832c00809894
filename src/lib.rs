pub mod core;
pub mod graph;
pub mod orchestration;
pub mod package;
pub mod registry;
pub mod security;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use crate::core::*;
pub use graph::{HasuraGraphStore, TriggerContext};
pub use orchestration::{PackageLocation, PackagePublisher, PublishReport};
pub use package::{CommandManifestExporter, SemverCrateComparer, VersionNegotiator};
pub use registry::{InstallOutcome, NpmRegistryClient};
pub use security::{CommandError, RegistryCredentials, SafeCommandExecutor, SecureTokenManager};
pub use workspace::{StagingWorkspace, TokioFileSystem, UuidGenerator};
