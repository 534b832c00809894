//! Read-modify-write helpers for `package.json` and `deep.json`
//!
//! Every write replaces the whole file with two-space pretty JSON. Field order
//! of existing manifests is preserved (`serde_json` is built with
//! `preserve_order`).

use crate::core::error::{PublishError, Result};
use crate::core::traits::{ExportedManifest, FileSystem};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Keyword marking registry packages produced from the graph
pub const DEEP_PACKAGE_KEYWORD: &str = "deep-package";

pub const PACKAGE_JSON: &str = "package.json";

/// Exported package content written next to the manifest
pub const DEEP_JSON: &str = "deep.json";

pub fn package_json_path(package_dir: &Path) -> PathBuf {
    package_dir.join(PACKAGE_JSON)
}

pub fn deep_json_path(package_dir: &Path) -> PathBuf {
    package_dir.join(DEEP_JSON)
}

pub struct PackageMetadataWriter {
    fs: Arc<dyn FileSystem>,
}

impl PackageMetadataWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn read_manifest(&self, path: &Path) -> Result<Map<String, Value>> {
        let content = self
            .fs
            .read_to_string(path)
            .await
            .map_err(|e| PublishError::manifest(path, e.to_string()))?;

        if content.trim().is_empty() {
            return Err(PublishError::manifest(path, "file is empty"));
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(PublishError::manifest(path, "not a JSON object")),
            Err(e) => Err(PublishError::manifest(path, e.to_string())),
        }
    }

    async fn write_json<T: serde::Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| PublishError::manifest(path, e.to_string()))?;

        self.fs
            .write(path, &content)
            .await
            .map_err(|e| PublishError::io(path, e))
    }

    /// Append `keyword` to the manifest keywords unless already present
    pub async fn add_keyword(&self, manifest_path: &Path, keyword: &str) -> Result<()> {
        let mut manifest = self.read_manifest(manifest_path).await?;

        match manifest.get_mut("keywords") {
            Some(Value::Array(keywords)) if !keywords.is_empty() => {
                if !keywords.iter().any(|k| k.as_str() == Some(keyword)) {
                    keywords.push(Value::String(keyword.to_string()));
                }
            }
            _ => {
                manifest.insert("keywords".to_string(), json!([keyword]));
            }
        }

        self.write_json(manifest_path, &manifest).await
    }

    /// Overwrite the manifest version
    pub async fn set_version(&self, manifest_path: &Path, version: &str) -> Result<()> {
        let mut manifest = self.read_manifest(manifest_path).await?;
        manifest.insert("version".to_string(), Value::String(version.to_string()));
        self.write_json(manifest_path, &manifest).await
    }

    /// Version recorded in the manifest, if any
    pub async fn read_version(&self, manifest_path: &Path) -> Result<Option<String>> {
        let manifest = self.read_manifest(manifest_path).await?;

        Ok(manifest
            .get("version")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string))
    }

    /// Manifest for a package the registry does not know yet
    pub async fn write_synthetic(&self, manifest_path: &Path, name: &str) -> Result<()> {
        self.write_json(manifest_path, &json!({ "name": name })).await
    }

    /// Write the exported content to `<package_dir>/deep.json`
    pub async fn write_export_file(
        &self,
        package_dir: &Path,
        manifest: &ExportedManifest,
    ) -> Result<PathBuf> {
        let path = deep_json_path(package_dir);
        self.write_json(&path, manifest).await?;
        Ok(path)
    }
}
