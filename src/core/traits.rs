//! Core traits and types for package publishing
//!
//! This module defines the capability abstractions the publish orchestrator is
//! built from. Each one is injected at construction time so the whole run can
//! be driven against fakes in tests.

use crate::core::error::Result;
use crate::graph::types::{LinkId, PackageRecord, VersionRecord};
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Filesystem
// ============================================================================

/// Filesystem operations used inside the staging workspace
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create a single directory. Fails if it already exists.
    async fn create_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Recursively remove a directory
    async fn remove_dir_all(&self, path: &Path) -> std::io::Result<()>;

    async fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Replace the whole file content
    async fn write(&self, path: &Path, contents: &str) -> std::io::Result<()>;
}

// ============================================================================
// Identity
// ============================================================================

/// Source of globally unique names for staging workspaces
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

// ============================================================================
// Semantic versions
// ============================================================================

/// Semantic version operations needed for version negotiation
pub trait SemverComparer: Send + Sync {
    /// `true` when `left` is strictly greater than `right`
    fn gt(&self, left: &str, right: &str) -> Result<bool>;

    /// Increment the patch component the way `npm version patch` does
    fn increment_patch(&self, version: &str) -> Result<String>;
}

// ============================================================================
// Processes
// ============================================================================

/// Captured result of an external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr, the way npm interleaves its diagnostics
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands without a shell
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> std::result::Result<ProcessOutput, CommandError>;
}

// ============================================================================
// Manifest export
// ============================================================================

/// One dependency of an exported package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDependency {
    pub name: String,
    pub version: String,
}

/// Output of the external packager
///
/// Fields other than `dependencies` and `errors` are carried through untouched
/// into `deep.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportedManifest {
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<serde_json::Value>>,
    #[serde(flatten)]
    pub content: serde_json::Map<String, serde_json::Value>,
}

impl ExportedManifest {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }
}

/// Turns an in-graph package definition into an exportable manifest
#[async_trait]
pub trait ManifestExporter: Send + Sync {
    async fn export(&self, package_id: LinkId) -> Result<ExportedManifest>;
}

// ============================================================================
// Graph data store
// ============================================================================

/// Reads and writes against the graph data store holding package records
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// String value stored on an arbitrary link
    async fn link_value(&self, link_id: LinkId) -> Result<Option<String>>;

    async fn package(&self, package_id: LinkId) -> Result<Option<PackageRecord>>;

    /// Version record attached to a package through the version relation
    async fn package_version(&self, package_id: LinkId) -> Result<Option<VersionRecord>>;

    /// Token values contained (transitively) by the given actor
    async fn find_tokens(&self, actor_id: LinkId) -> Result<Vec<SecretString>>;

    /// Overwrite the version string of the package's version record
    async fn update_package_version(&self, package_id: LinkId, version: &str) -> Result<()>;
}

// ============================================================================
// Capability bundle
// ============================================================================

/// Everything the orchestrator needs from the outside world
#[derive(Clone)]
pub struct Capabilities {
    pub fs: Arc<dyn FileSystem>,
    pub runner: Arc<dyn ProcessRunner>,
    pub ids: Arc<dyn IdGenerator>,
    pub semver: Arc<dyn SemverComparer>,
    pub exporter: Arc<dyn ManifestExporter>,
    pub graph: Arc<dyn GraphStore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exported_manifest_keeps_unknown_fields() {
        let json = r#"{
            "package": {"name": "acme-widget", "version": "1.0.0"},
            "data": [{"id": 1, "type": "Type"}],
            "dependencies": [{"name": "left-pad", "version": "1.3.0"}]
        }"#;

        let manifest: ExportedManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.dependencies[0].name, "left-pad");
        assert!(manifest.content.contains_key("package"));
        assert!(manifest.content.contains_key("data"));
        assert!(!manifest.has_errors());

        let back = serde_json::to_value(&manifest).unwrap();
        assert_eq!(back["data"][0]["type"], "Type");
        assert!(back.get("errors").is_none());
    }

    #[test]
    fn test_exported_manifest_errors() {
        let with_errors: ExportedManifest =
            serde_json::from_str(r#"{"dependencies": [], "errors": ["broken"]}"#).unwrap();
        assert!(with_errors.has_errors());

        let empty_errors: ExportedManifest =
            serde_json::from_str(r#"{"dependencies": [], "errors": []}"#).unwrap();
        assert!(!empty_errors.has_errors());
    }

    #[test]
    fn test_missing_dependencies_default_to_empty() {
        let manifest: ExportedManifest = serde_json::from_str(r#"{"package": {}}"#).unwrap();
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_process_output_success() {
        let output = ProcessOutput {
            status: Some(0),
            stdout: "added 1 package\n".to_string(),
            stderr: "npm WARN\n".to_string(),
        };
        assert!(output.success());
        assert_eq!(output.combined(), "added 1 package\nnpm WARN\n");

        let killed = ProcessOutput {
            status: None,
            ..output
        };
        assert!(!killed.success());
    }
}
