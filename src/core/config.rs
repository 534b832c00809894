//! Configuration structures and types for npm-packager
//!
//! This module provides type-safe configuration management with serde support.
//! Every leaf is optional so layered sources can be merged field by field;
//! the accessor methods supply the defaults.

use crate::core::error::PublishError;
use crate::graph::types::LinkId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Registry used when nothing else is configured
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";

/// Root configuration object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackagerConfig {
    /// npm registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Staging workspace settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Graph data store connection
    #[serde(default)]
    pub graph: GraphConfig,

    /// External manifest exporter
    #[serde(default)]
    pub exporter: ExporterConfig,
}

/// npm registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Registry URL (default: https://registry.npmjs.org/)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Package access level (default: "public")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<NpmAccess>,

    /// Per-command timeout in seconds. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none", rename = "commandTimeoutSecs")]
    pub command_timeout_secs: Option<u64>,
}

/// npm package access level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NpmAccess {
    #[default]
    Public,
    Restricted,
}

impl NpmAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            NpmAccess::Public => "public",
            NpmAccess::Restricted => "restricted",
        }
    }
}

/// Staging workspace configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    /// Directory under which run workspaces are created (default: system temp dir)
    #[serde(skip_serializing_if = "Option::is_none", rename = "tempRoot")]
    pub temp_root: Option<PathBuf>,
}

/// Graph data store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
    /// GraphQL endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Admin secret sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Type ids of the links the packager walks
    #[serde(default)]
    pub types: GraphTypeIds,
}

/// Configured type ids, possibly incomplete
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphTypeIds {
    #[serde(skip_serializing_if = "Option::is_none", rename = "packageVersion")]
    pub package_version: Option<LinkId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<LinkId>,

    #[serde(skip_serializing_if = "Option::is_none", rename = "containTree")]
    pub contain_tree: Option<LinkId>,
}

/// Type ids with every entry present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTypeIds {
    pub package_version: LinkId,
    pub token: LinkId,
    pub contain_tree: LinkId,
}

impl GraphTypeIds {
    pub fn resolve(&self) -> Result<ResolvedTypeIds, PublishError> {
        let missing = |field: &str| {
            PublishError::ConfigError(format!("graph.types.{} is not set", field))
        };

        Ok(ResolvedTypeIds {
            package_version: self.package_version.ok_or_else(|| missing("packageVersion"))?,
            token: self.token.ok_or_else(|| missing("token"))?,
            contain_tree: self.contain_tree.ok_or_else(|| missing("containTree"))?,
        })
    }
}

/// Manifest exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExporterConfig {
    /// Executable invoked with the package id as its last argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments placed before the package id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl PackagerConfig {
    pub fn registry_url(&self) -> &str {
        self.registry.url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL)
    }

    pub fn access(&self) -> NpmAccess {
        self.registry.access.unwrap_or_default()
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.registry.command_timeout_secs.map(Duration::from_secs)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.workspace
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PackagerConfig::default();

        assert_eq!(config.registry_url(), DEFAULT_REGISTRY_URL);
        assert_eq!(config.access(), NpmAccess::Public);
        assert!(config.command_timeout().is_none());
        assert_eq!(config.temp_root(), std::env::temp_dir());
    }

    #[test]
    fn test_yaml_deserialization() {
        let yaml = r#"
registry:
  url: https://npm.example.com/
  access: restricted
  commandTimeoutSecs: 120
workspace:
  tempRoot: /var/tmp/packager
graph:
  url: http://localhost:8080/v1/graphql
  secret: ${HASURA_SECRET}
  types:
    packageVersion: 41
    token: 77
    containTree: 3
exporter:
  command: deep-export
  args: ["--format", "json"]
"#;

        let config: PackagerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.registry_url(), "https://npm.example.com/");
        assert_eq!(config.access(), NpmAccess::Restricted);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.temp_root(), PathBuf::from("/var/tmp/packager"));
        assert_eq!(config.graph.secret.as_deref(), Some("${HASURA_SECRET}"));
        assert_eq!(
            config.graph.types.resolve().unwrap(),
            ResolvedTypeIds {
                package_version: 41,
                token: 77,
                contain_tree: 3,
            }
        );
        assert_eq!(config.exporter.command.as_deref(), Some("deep-export"));
    }

    #[test]
    fn test_resolve_reports_missing_type() {
        let types = GraphTypeIds {
            package_version: Some(41),
            token: None,
            contain_tree: Some(3),
        };

        let error = types.resolve().unwrap_err();
        assert!(error.to_string().contains("graph.types.token"));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: PackagerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PackagerConfig::default());
    }

    #[test]
    fn test_access_serialization() {
        let json = serde_json::to_string(&NpmAccess::Public).unwrap();
        assert_eq!(json, r#""public""#);
        assert_eq!(NpmAccess::Restricted.as_str(), "restricted");
    }
}
