//! Fakes for the capability traits, shared by unit tests

use crate::core::error::{PublishError, Result};
use crate::core::traits::{
    ExportedManifest, GraphStore, IdGenerator, ManifestExporter, ProcessOutput, ProcessRunner,
};
use crate::graph::types::{LinkId, PackageRecord, VersionRecord};
use crate::security::command_executor::CommandError;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub fn ok(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(code: i32, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        status: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// One command seen by [`FakeProcessRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl RecordedCommand {
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }

    /// Value following a flag such as `--prefix`
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == name)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn is_install(&self) -> bool {
        self.has_arg("install")
    }

    pub fn is_publish(&self) -> bool {
        self.has_arg("publish")
    }

    pub fn is_set(&self) -> bool {
        self.args.first().map(String::as_str) == Some("set")
    }

    /// Package spec of an install command
    pub fn install_spec(&self) -> Option<&str> {
        self.flag("install")
    }
}

type Handler = Box<dyn Fn(&RecordedCommand) -> std::result::Result<ProcessOutput, CommandError> + Send + Sync>;

/// Process runner that records every call and answers through a handler
pub struct FakeProcessRunner {
    calls: Mutex<Vec<RecordedCommand>>,
    handler: Handler,
}

impl FakeProcessRunner {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RecordedCommand) -> std::result::Result<ProcessOutput, CommandError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(|_| Ok(ok("")))
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> std::result::Result<ProcessOutput, CommandError> {
        let command = RecordedCommand {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        };
        self.calls.lock().unwrap().push(command.clone());
        (self.handler)(&command)
    }
}

pub struct FixedIdGenerator(pub &'static str);

impl IdGenerator for FixedIdGenerator {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

/// Exporter returning a canned manifest
pub struct FakeExporter {
    manifest: ExportedManifest,
    calls: Mutex<Vec<LinkId>>,
}

impl FakeExporter {
    pub fn new(manifest: ExportedManifest) -> Self {
        Self {
            manifest,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        Self::new(serde_json::from_value(json).unwrap())
    }

    pub fn calls(&self) -> Vec<LinkId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestExporter for FakeExporter {
    async fn export(&self, package_id: LinkId) -> Result<ExportedManifest> {
        self.calls.lock().unwrap().push(package_id);
        Ok(self.manifest.clone())
    }
}

/// In-memory graph store
#[derive(Default)]
pub struct FakeGraphStore {
    pub link_values: HashMap<LinkId, String>,
    pub packages: HashMap<LinkId, PackageRecord>,
    pub versions: HashMap<LinkId, VersionRecord>,
    pub tokens: HashMap<LinkId, Vec<String>>,
    pub fail_updates: bool,
    updates: Mutex<Vec<(LinkId, String)>>,
}

impl FakeGraphStore {
    /// Store holding one package with a version and an actor owning a token
    pub fn with_package(
        package_id: LinkId,
        name_link_id: LinkId,
        name: &str,
        version: Option<&str>,
    ) -> Self {
        let mut store = Self::default();
        store.link_values.insert(name_link_id, name.to_string());
        store.packages.insert(
            package_id,
            PackageRecord {
                id: package_id,
                name: name.to_string(),
            },
        );
        if let Some(version) = version {
            store.versions.insert(
                package_id,
                VersionRecord {
                    id: package_id + 1000,
                    version: version.to_string(),
                },
            );
        }
        store
    }

    pub fn with_token(mut self, actor_id: LinkId, token: &str) -> Self {
        self.tokens
            .entry(actor_id)
            .or_default()
            .push(token.to_string());
        self
    }

    pub fn updates(&self) -> Vec<(LinkId, String)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for FakeGraphStore {
    async fn link_value(&self, link_id: LinkId) -> Result<Option<String>> {
        Ok(self.link_values.get(&link_id).cloned())
    }

    async fn package(&self, package_id: LinkId) -> Result<Option<PackageRecord>> {
        Ok(self.packages.get(&package_id).cloned())
    }

    async fn package_version(&self, package_id: LinkId) -> Result<Option<VersionRecord>> {
        Ok(self.versions.get(&package_id).cloned())
    }

    async fn find_tokens(&self, actor_id: LinkId) -> Result<Vec<SecretString>> {
        Ok(self
            .tokens
            .get(&actor_id)
            .map(|tokens| {
                tokens
                    .iter()
                    .map(|t| SecretString::new(t.clone().into()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_package_version(&self, package_id: LinkId, version: &str) -> Result<()> {
        if self.fail_updates {
            return Err(PublishError::data_store("update rejected"));
        }
        self.updates
            .lock()
            .unwrap()
            .push((package_id, version.to_string()));
        Ok(())
    }
}
