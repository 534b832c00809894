//! Package Publisher - Main orchestrator for publishing a graph package to npm
//!
//! Manages the complete publishing workflow:
//! - Pre-flight checks against the data store (name, version)
//! - Staging workspace lifecycle
//! - Registry authentication and the existence probe
//! - Version negotiation and write-back
//! - Export, dependency installation and metadata files
//! - Publishing, with teardown on every exit path

use crate::core::config::PackagerConfig;
use crate::core::error::{PublishError, Result};
use crate::core::state_machine::{PublishState, PublishStateMachine};
use crate::core::traits::Capabilities;
use crate::graph::types::{LinkId, TriggerContext};
use crate::package::exporter::ManifestExporterBridge;
use crate::package::manifest_writer::{DEEP_PACKAGE_KEYWORD, PackageMetadataWriter, package_json_path};
use crate::package::negotiator::VersionNegotiator;
use crate::registry::installer::DependencyInstaller;
use crate::registry::npm_client::{InstallOutcome, NpmRegistryClient};
use crate::security::token_manager::{RegistryCredentials, SecureTokenManager};
use crate::workspace::staging::StagingWorkspace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where the package directory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageLocation {
    /// Installed from the registry into `node_modules/<name>`
    Existing,
    /// Not on the registry yet; the workspace root with a synthetic manifest
    New,
}

/// Publishing report returned after a successful run
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub package_id: LinkId,
    pub package_name: String,
    pub version: String,
    /// Version found on the registry before this run
    pub registry_version: Option<String>,
    pub location: PackageLocation,
    pub dependencies: Vec<String>,
    pub published_at: DateTime<Utc>,
    /// Milliseconds
    pub duration: u64,
    pub history: String,
}

/// Values checked before any side effect
#[derive(Debug, Clone, PartialEq, Eq)]
struct Preflight {
    package_id: LinkId,
    name: String,
    local_version: String,
}

/// Outcome of the steps run inside the workspace
struct StagedPublish {
    version: String,
    registry_version: Option<String>,
    location: PackageLocation,
    dependencies: Vec<String>,
}

fn metadata(pairs: &[(&str, serde_json::Value)]) -> Option<HashMap<String, serde_json::Value>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

/// Main package publisher orchestrator
pub struct PackagePublisher {
    caps: Capabilities,
    config: PackagerConfig,
}

impl PackagePublisher {
    pub fn new(caps: Capabilities, config: PackagerConfig) -> Self {
        Self { caps, config }
    }

    /// Publish the package referenced by the trigger
    ///
    /// Nothing is touched until the pre-flight checks pass. From then on the
    /// staging workspace exists and is removed before this returns, whatever
    /// the outcome.
    pub async fn publish(&self, trigger: &TriggerContext) -> Result<PublishReport> {
        let mut machine = PublishStateMachine::new();
        let preflight = self.preflight(trigger).await?;

        let workspace = match StagingWorkspace::open(
            self.caps.fs.clone(),
            self.caps.ids.as_ref(),
            &self.config.temp_root(),
        )
        .await
        {
            Ok(workspace) => workspace,
            Err(e) => {
                machine.fail(&e);
                return Err(e);
            }
        };

        let result = self
            .run_staged(trigger, &preflight, workspace.path(), &mut machine)
            .await;

        if let Err(e) = &result {
            machine.fail(e);
        }

        workspace.close().await;
        let cleaned = machine.transition(PublishState::Cleaned, None);
        if let Some(error) = machine.get_last_error() {
            log::error!("Publishing {} failed: {}", preflight.name, error);
        }
        log::debug!("Publish history:\n{}", machine.get_history());

        let staged = result?;
        cleaned?;

        Ok(PublishReport {
            package_id: preflight.package_id,
            package_name: preflight.name,
            version: staged.version,
            registry_version: staged.registry_version,
            location: staged.location,
            dependencies: staged.dependencies,
            published_at: Utc::now(),
            duration: machine.get_elapsed_time().max(0) as u64,
            history: machine.get_history(),
        })
    }

    /// Read and cross-check the declared name and the local version
    async fn preflight(&self, trigger: &TriggerContext) -> Result<Preflight> {
        let graph = &self.caps.graph;
        let package_id = trigger.package_id();
        let name_link_id = trigger.new_link.to_id;

        let name = graph
            .link_value(name_link_id)
            .await?
            .filter(|name| !name.trim().is_empty())
            .ok_or(PublishError::PackageNameMissing {
                link_id: name_link_id,
            })?;

        let local_version = graph
            .package_version(package_id)
            .await?
            .map(|record| record.version)
            .filter(|version| !version.trim().is_empty())
            .ok_or(PublishError::VersionMissing { package_id })?;

        let actual = graph
            .package(package_id)
            .await?
            .map(|record| record.name)
            .unwrap_or_default();

        if name != actual {
            return Err(PublishError::PackageNameMismatch {
                declared: name,
                actual,
            });
        }

        log::info!(
            "Publishing package {} ({}) declared at version {}",
            name,
            package_id,
            local_version
        );

        Ok(Preflight {
            package_id,
            name,
            local_version,
        })
    }

    async fn run_staged(
        &self,
        trigger: &TriggerContext,
        preflight: &Preflight,
        workspace: &Path,
        machine: &mut PublishStateMachine,
    ) -> Result<StagedPublish> {
        let writer = PackageMetadataWriter::new(self.caps.fs.clone());

        // Authenticate
        let tokens = self
            .caps
            .graph
            .find_tokens(trigger.triggered_by_link_id)
            .await?;
        let token = SecureTokenManager::select_token(tokens)?;
        let credentials =
            RegistryCredentials::for_workspace(self.config.registry_url(), token, workspace);
        let client = NpmRegistryClient::new(self.caps.runner.clone(), self.config.access());

        client.authenticate(&credentials, workspace).await?;
        machine.transition(
            PublishState::Authenticated,
            metadata(&[("registry", json!(credentials.registry_url()))]),
        )?;

        // Probe the registry by installing the package itself
        let installer = DependencyInstaller::new(&client, &credentials);
        let probe = installer.install_one(&preflight.name, workspace).await;
        machine.transition(
            PublishState::Probed,
            metadata(&[("resolved", json!(probe.is_resolved()))]),
        )?;

        let (location, package_dir) = match probe {
            InstallOutcome::Resolved { .. } => {
                machine.transition(PublishState::ExistingPackagePath, None)?;
                (
                    PackageLocation::Existing,
                    workspace.join("node_modules").join(&preflight.name),
                )
            }
            InstallOutcome::Rejected { cause } => {
                log::info!(
                    "{} is not on the registry yet, starting a new package: {}",
                    preflight.name,
                    cause
                );
                writer
                    .write_synthetic(&package_json_path(workspace), &preflight.name)
                    .await?;
                machine.transition(PublishState::NewPackagePath, None)?;
                (PackageLocation::New, workspace.to_path_buf())
            }
        };
        let manifest_path = package_json_path(&package_dir);

        // Negotiate and record the version
        let registry_version = writer.read_version(&manifest_path).await?;
        let version = VersionNegotiator::new(self.caps.semver.as_ref())
            .negotiate(&preflight.local_version, registry_version.as_deref())?;

        self.caps
            .graph
            .update_package_version(preflight.package_id, &version)
            .await?;
        writer.set_version(&manifest_path, &version).await?;
        machine.transition(
            PublishState::VersionSet,
            metadata(&[("version", json!(version))]),
        )?;

        // Export
        let exported = ManifestExporterBridge::new(self.caps.exporter.clone())
            .export(preflight.package_id)
            .await?;
        machine.transition(PublishState::Exported, None)?;

        let dependencies = installer
            .install_all(&exported.dependencies, &package_dir)
            .await?;
        machine.transition(
            PublishState::DependenciesInstalled,
            metadata(&[("count", json!(dependencies.len()))]),
        )?;

        writer
            .add_keyword(&manifest_path, DEEP_PACKAGE_KEYWORD)
            .await?;
        writer.write_export_file(&package_dir, &exported).await?;
        machine.transition(PublishState::MetadataWritten, None)?;

        client.publish(&credentials, &package_dir).await?;
        machine.transition(PublishState::Published, None)?;

        log::info!("Published {}@{}", preflight.name, version);

        Ok(StagedPublish {
            version,
            registry_version,
            location,
            dependencies,
        })
    }

    /// Where the staging workspace is created
    pub fn temp_root(&self) -> PathBuf {
        self.config.temp_root()
    }
}
