//! Manifest export
//!
//! [`ManifestExporterBridge`] validates whatever the injected
//! [`ManifestExporter`] produces. [`CommandManifestExporter`] is the concrete
//! exporter used by the binary: an external command printing the manifest as
//! JSON on stdout.

use crate::core::error::{PublishError, Result};
use crate::core::traits::{ExportedManifest, ManifestExporter, ProcessRunner};
use crate::graph::types::LinkId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Rejects exports that report errors
pub struct ManifestExporterBridge {
    exporter: Arc<dyn ManifestExporter>,
}

impl ManifestExporterBridge {
    pub fn new(exporter: Arc<dyn ManifestExporter>) -> Self {
        Self { exporter }
    }

    pub async fn export(&self, package_id: LinkId) -> Result<ExportedManifest> {
        let manifest = self.exporter.export(package_id).await?;

        if manifest.has_errors() {
            return Err(PublishError::ExportFailed {
                errors: manifest.errors.unwrap_or_default(),
            });
        }

        log::info!(
            "Exported package {} with {} dependencies",
            package_id,
            manifest.dependencies.len()
        );

        Ok(manifest)
    }
}

/// Runs `<command> <args...> <package id>` and parses stdout as the manifest
pub struct CommandManifestExporter {
    runner: Arc<dyn ProcessRunner>,
    command: String,
    args: Vec<String>,
    cwd: PathBuf,
}

impl CommandManifestExporter {
    pub fn new(runner: Arc<dyn ProcessRunner>, command: &str, args: Vec<String>) -> Self {
        Self {
            runner,
            command: command.to_string(),
            args,
            cwd: std::env::temp_dir(),
        }
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }
}

#[async_trait]
impl ManifestExporter for CommandManifestExporter {
    async fn export(&self, package_id: LinkId) -> Result<ExportedManifest> {
        let mut args = self.args.clone();
        args.push(package_id.to_string());

        log::info!("Running exporter: {} {}", self.command, args.join(" "));

        let output = self
            .runner
            .run(&self.command, &args, &self.cwd)
            .await
            .map_err(|e| PublishError::ExporterUnavailable {
                message: e.to_string(),
            })?;

        if !output.success() {
            return Err(PublishError::ExporterUnavailable {
                message: format!(
                    "{} exited with {:?}: {}",
                    self.command,
                    output.status,
                    output.stderr.trim()
                ),
            });
        }

        serde_json::from_str(&output.stdout).map_err(|e| PublishError::ExporterUnavailable {
            message: format!("invalid exporter output: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExporter, FakeProcessRunner, failed, ok};
    use serde_json::json;

    #[tokio::test]
    async fn test_bridge_passes_clean_export_through() {
        let exporter = Arc::new(FakeExporter::from_json(json!({
            "package": {"name": "acme-widget"},
            "dependencies": [{"name": "left-pad", "version": "1.3.0"}],
            "errors": []
        })));
        let bridge = ManifestExporterBridge::new(exporter.clone());

        let manifest = bridge.export(42).await.unwrap();

        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.content["package"]["name"], "acme-widget");
        assert_eq!(exporter.calls(), vec![42]);
    }

    #[tokio::test]
    async fn test_bridge_rejects_export_errors() {
        let exporter = Arc::new(FakeExporter::from_json(json!({
            "dependencies": [],
            "errors": ["Link 17 references a missing type"]
        })));
        let bridge = ManifestExporterBridge::new(exporter);

        let error = bridge.export(42).await.unwrap_err();

        match &error {
            PublishError::ExportFailed { errors } => {
                assert_eq!(errors, &vec![json!("Link 17 references a missing type")]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.to_string().contains("missing type"));
    }

    #[tokio::test]
    async fn test_command_exporter_appends_package_id() {
        let runner = Arc::new(FakeProcessRunner::new(|_| {
            Ok(ok(r#"{"package": {"name": "acme-widget"}, "dependencies": []}"#))
        }));
        let exporter = CommandManifestExporter::new(
            runner.clone(),
            "deep-export",
            vec!["--format".to_string(), "json".to_string()],
        );

        let manifest = exporter.export(42).await.unwrap();

        assert!(manifest.dependencies.is_empty());
        let call = &runner.calls()[0];
        assert_eq!(call.program, "deep-export");
        assert_eq!(call.args, vec!["--format", "json", "42"]);
    }

    #[tokio::test]
    async fn test_command_exporter_failures() {
        let runner = Arc::new(FakeProcessRunner::new(|_| Ok(failed(2, "connection refused"))));
        let exporter = CommandManifestExporter::new(runner, "deep-export", vec![]);
        let error = exporter.export(42).await.unwrap_err();
        assert_eq!(error.code(), "EXPORTER_UNAVAILABLE");
        assert!(error.to_string().contains("connection refused"));

        let runner = Arc::new(FakeProcessRunner::new(|_| Ok(ok("not json"))));
        let exporter = CommandManifestExporter::new(runner, "deep-export", vec![]);
        let error = exporter.export(42).await.unwrap_err();
        assert_eq!(error.code(), "EXPORTER_UNAVAILABLE");
    }
}
