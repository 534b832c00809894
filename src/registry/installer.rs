//! Dependency installation into the staging workspace

use crate::core::error::{PublishError, Result};
use crate::core::traits::ManifestDependency;
use crate::registry::npm_client::{InstallOutcome, NpmRegistryClient};
use crate::security::token_manager::RegistryCredentials;
use std::path::Path;

/// Install spec for an exported dependency, pinned to compatible patches
pub fn dependency_spec(dependency: &ManifestDependency) -> String {
    format!("{}@~{}", dependency.name, dependency.version)
}

/// Installs packages with one set of credentials
pub struct DependencyInstaller<'a> {
    client: &'a NpmRegistryClient,
    credentials: &'a RegistryCredentials,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(client: &'a NpmRegistryClient, credentials: &'a RegistryCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Install a single spec; a rejection is returned, never raised
    pub async fn install_one(&self, spec: &str, dir: &Path) -> InstallOutcome {
        self.client.install(self.credentials, spec, dir).await
    }

    /// Install every dependency in order, stopping at the first rejection
    ///
    /// Returns the installed specs.
    pub async fn install_all(
        &self,
        dependencies: &[ManifestDependency],
        dir: &Path,
    ) -> Result<Vec<String>> {
        let mut installed = Vec::with_capacity(dependencies.len());

        for dependency in dependencies {
            let spec = dependency_spec(dependency);

            match self.install_one(&spec, dir).await {
                InstallOutcome::Resolved { .. } => {
                    log::info!("Installed dependency {}", spec);
                    installed.push(spec);
                }
                InstallOutcome::Rejected { cause } => {
                    return Err(PublishError::DependencyInstallFailed { spec, cause });
                }
            }
        }

        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NpmAccess;
    use crate::testing::{FakeProcessRunner, failed, ok};
    use secrecy::SecretString;
    use std::sync::Arc;

    fn credentials() -> RegistryCredentials {
        RegistryCredentials::for_workspace(
            "https://registry.npmjs.org/",
            SecretString::new("npm_secret_token".to_string().into()),
            Path::new("/tmp/ws"),
        )
    }

    fn dependency(name: &str, version: &str) -> ManifestDependency {
        ManifestDependency {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_dependency_spec_uses_tilde_range() {
        assert_eq!(
            dependency_spec(&dependency("left-pad", "1.3.0")),
            "left-pad@~1.3.0"
        );
        assert_eq!(
            dependency_spec(&dependency("@deep/core", "0.1.2")),
            "@deep/core@~0.1.2"
        );
    }

    #[tokio::test]
    async fn test_install_all_in_order() {
        let runner = Arc::new(FakeProcessRunner::new(|_| Ok(ok("added 1 package"))));
        let client = NpmRegistryClient::new(runner.clone(), NpmAccess::Public);
        let credentials = credentials();
        let installer = DependencyInstaller::new(&client, &credentials);

        let installed = installer
            .install_all(
                &[dependency("a", "1.0.0"), dependency("b", "2.0.0")],
                Path::new("/tmp/ws/node_modules/acme-widget"),
            )
            .await
            .unwrap();

        assert_eq!(installed, vec!["a@~1.0.0", "b@~2.0.0"]);
        let specs: Vec<_> = runner
            .calls()
            .iter()
            .filter_map(|c| c.install_spec().map(str::to_string))
            .collect();
        assert_eq!(specs, vec!["a@~1.0.0", "b@~2.0.0"]);
        assert!(
            runner
                .calls()
                .iter()
                .all(|c| c.flag("--prefix") == Some("/tmp/ws/node_modules/acme-widget"))
        );
    }

    #[tokio::test]
    async fn test_install_all_stops_at_first_rejection() {
        let runner = Arc::new(FakeProcessRunner::new(|command| {
            if command.install_spec() == Some("b@~2.0.0") {
                Ok(failed(1, "npm ERR! 404 Not Found"))
            } else {
                Ok(ok(""))
            }
        }));
        let client = NpmRegistryClient::new(runner.clone(), NpmAccess::Public);
        let credentials = credentials();
        let installer = DependencyInstaller::new(&client, &credentials);

        let error = installer
            .install_all(
                &[
                    dependency("a", "1.0.0"),
                    dependency("b", "2.0.0"),
                    dependency("c", "3.0.0"),
                ],
                Path::new("/tmp/ws"),
            )
            .await
            .unwrap_err();

        match error {
            PublishError::DependencyInstallFailed { spec, cause } => {
                assert_eq!(spec, "b@~2.0.0");
                assert!(cause.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_install_all_with_no_dependencies() {
        let runner = Arc::new(FakeProcessRunner::succeeding());
        let client = NpmRegistryClient::new(runner.clone(), NpmAccess::Public);
        let credentials = credentials();
        let installer = DependencyInstaller::new(&client, &credentials);

        let installed = installer.install_all(&[], Path::new("/tmp/ws")).await.unwrap();

        assert!(installed.is_empty());
        assert!(runner.calls().is_empty());
    }
}
