//! npm registry client
//!
//! Thin wrapper over the npm CLI providing the three registry operations a
//! publish run needs:
//! - authenticate: store the token in the workspace-local npm user config
//! - install: fetch a package into a directory, reported as a tagged outcome
//! - publish: publish a directory as a package
//!
//! Every call receives the [`RegistryCredentials`] explicitly and passes the
//! registry URL and user config path on the command line, so no global npm
//! state is read or written.

use crate::core::config::NpmAccess;
use crate::core::error::{PublishError, Result};
use crate::core::traits::{ProcessOutput, ProcessRunner};
use crate::security::command_executor::CommandError;
use crate::security::token_manager::RegistryCredentials;
use secrecy::ExposeSecret;
use std::path::Path;
use std::sync::Arc;

const NPM: &str = "npm";

/// Result of `npm install`
///
/// A rejection is an expected outcome (the probe uses it to detect packages
/// that were never published), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Resolved { exit_status: i32, output: String },
    Rejected { cause: String },
}

impl InstallOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, InstallOutcome::Resolved { .. })
    }
}

/// npm registry client
pub struct NpmRegistryClient {
    runner: Arc<dyn ProcessRunner>,
    access: NpmAccess,
}

impl NpmRegistryClient {
    pub fn new(runner: Arc<dyn ProcessRunner>, access: NpmAccess) -> Self {
        Self { runner, access }
    }

    /// Flags binding a command to the given credentials
    fn credential_args(credentials: &RegistryCredentials) -> Vec<String> {
        vec![
            "--registry".to_string(),
            credentials.registry_url().to_string(),
            "--userconfig".to_string(),
            credentials.userconfig().display().to_string(),
        ]
    }

    async fn execute(
        &self,
        credentials: &RegistryCredentials,
        args: Vec<String>,
        cwd: &Path,
    ) -> std::result::Result<ProcessOutput, CommandError> {
        let command_line = credentials.mask(&format!("{} {}", NPM, args.join(" ")));
        log::info!("{} (in {})", command_line, cwd.display());

        let output = self.runner.run(NPM, &args, cwd).await?;

        log::debug!(
            "{} exited with {:?}\n{}",
            command_line,
            output.status,
            credentials.mask(&output.combined())
        );

        Ok(output)
    }

    /// Store the token for the registry in the workspace user config
    pub async fn authenticate(
        &self,
        credentials: &RegistryCredentials,
        workspace: &Path,
    ) -> Result<()> {
        let mut args = vec![
            "set".to_string(),
            format!(
                "{}={}",
                credentials.auth_key(),
                credentials.token().expose_secret()
            ),
        ];
        args.extend(Self::credential_args(credentials));

        let output = self
            .execute(credentials, args, workspace)
            .await
            .map_err(|e| PublishError::AuthenticationFailed {
                message: credentials.mask(&e.to_string()),
            })?;

        if !output.success() {
            return Err(PublishError::AuthenticationFailed {
                message: credentials.mask(output.stderr.trim()),
            });
        }

        Ok(())
    }

    /// Install `spec` (`name` or `name@range`) into `dir`
    pub async fn install(
        &self,
        credentials: &RegistryCredentials,
        spec: &str,
        dir: &Path,
    ) -> InstallOutcome {
        let mut args = vec![
            "--prefix".to_string(),
            dir.display().to_string(),
            "install".to_string(),
            spec.to_string(),
        ];
        args.extend(Self::credential_args(credentials));

        match self.execute(credentials, args, dir).await {
            Ok(output) if output.success() => InstallOutcome::Resolved {
                exit_status: output.status.unwrap_or(0),
                output: credentials.mask(&output.combined()),
            },
            Ok(output) => InstallOutcome::Rejected {
                cause: credentials.mask(output.combined().trim()),
            },
            Err(e) => InstallOutcome::Rejected {
                cause: credentials.mask(&e.to_string()),
            },
        }
    }

    /// Publish the package in `dir`
    pub async fn publish(&self, credentials: &RegistryCredentials, dir: &Path) -> Result<String> {
        let mut args = vec![
            "publish".to_string(),
            "--access".to_string(),
            self.access.as_str().to_string(),
        ];
        args.extend(Self::credential_args(credentials));

        let output = self
            .execute(credentials, args, dir)
            .await
            .map_err(|e| PublishError::PublishFailed {
                message: credentials.mask(&e.to_string()),
            })?;

        if !output.success() {
            let stderr = credentials.mask(output.stderr.trim());
            // npm asks for a one-time password when 2FA is enforced on publish
            let message = if stderr.contains("OTP") || stderr.contains("two-factor") {
                format!("2要素認証が必要です: {}", stderr)
            } else {
                stderr
            };
            return Err(PublishError::PublishFailed { message });
        }

        Ok(credentials.mask(&output.combined()))
    }
}
