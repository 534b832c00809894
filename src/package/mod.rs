pub mod exporter;
pub mod manifest_writer;
pub mod negotiator;

pub use exporter::{CommandManifestExporter, ManifestExporterBridge};
pub use manifest_writer::{DEEP_PACKAGE_KEYWORD, PackageMetadataWriter};
pub use negotiator::{SemverCrateComparer, VersionNegotiator};
