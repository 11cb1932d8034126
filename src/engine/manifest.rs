//! Engine that writes the declaration set as a JSON manifest.
//!
//! Declarations are buffered during a run and only reach the disk on
//! `commit`, so an aborted run never leaves a partial manifest behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StackConfig;
use crate::error::{EngineError, Result, StackError};

use super::lookup::StaticLookup;
use super::types::{DeclaredValue, ResourceDeclaration, ResourceHandle};
use super::ProvisioningEngine;

/// Format version written into every manifest.
pub const MANIFEST_VERSION: u32 = 1;

/// Engine that hands declarations to an external executor through a file.
#[derive(Debug)]
pub struct ManifestEngine {
    path: PathBuf,
    stack: String,
    region: String,
    config_hash: String,
    lookup: StaticLookup,
    pending: Mutex<Vec<ResourceDeclaration>>,
}

/// On-disk manifest layout.
#[derive(Debug, Serialize)]
struct Manifest<'a> {
    version: u32,
    stack: &'a str,
    region: &'a str,
    config_hash: &'a str,
    generated_at: DateTime<Utc>,
    declarations: Vec<ManifestEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    urn: String,
    #[serde(rename = "type")]
    type_token: &'static str,
    name: &'a str,
    wave: usize,
    depends_on: Vec<&'a str>,
    properties: &'a BTreeMap<String, DeclaredValue>,
}

impl ManifestEngine {
    /// Creates an engine writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, lookup: StaticLookup) -> Self {
        Self {
            path: path.into(),
            stack: String::new(),
            region: String::new(),
            config_hash: String::new(),
            lookup,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Creates an engine for a stack, answering lookups from its configuration.
    #[must_use]
    pub fn for_config(
        path: impl Into<PathBuf>,
        config: &StackConfig,
        config_hash: impl Into<String>,
    ) -> Self {
        Self::new(path, StaticLookup::from(&config.lookup_or_default()))
            .with_stack(config.qualified_name(), config.region.clone(), config_hash)
    }

    /// Sets the stack metadata written into the manifest header.
    #[must_use]
    pub fn with_stack(
        mut self,
        stack: impl Into<String>,
        region: impl Into<String>,
        config_hash: impl Into<String>,
    ) -> Self {
        self.stack = stack.into();
        self.region = region.into();
        self.config_hash = config_hash.into();
        self
    }

    /// Returns the manifest path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, message: String) -> StackError {
        EngineError::ManifestWrite {
            path: self.path.clone(),
            message,
        }
        .into()
    }

    fn render(&self, declarations: &[ResourceDeclaration]) -> Result<String> {
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            stack: &self.stack,
            region: &self.region,
            config_hash: &self.config_hash,
            generated_at: Utc::now(),
            declarations: declarations
                .iter()
                .map(|declaration| ManifestEntry {
                    urn: declaration.urn(),
                    type_token: declaration.kind.type_token(),
                    name: &declaration.name,
                    wave: declaration.wave,
                    depends_on: declaration.depends_on.iter().map(|h| h.urn.as_str()).collect(),
                    properties: &declaration.properties,
                })
                .collect(),
        };

        serde_json::to_string_pretty(&manifest)
            .map_err(|e| self.write_error(format!("Failed to serialize manifest: {e}")))
    }

    /// Writes to a temporary file first, then renames for atomicity.
    async fn write_atomic(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(format!("Failed to create directory: {e}")))?;
        }

        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_error(format!("Failed to create temp manifest: {e}")))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| self.write_error(format!("Failed to write manifest: {e}")))?;

        file.sync_all()
            .await
            .map_err(|e| self.write_error(format!("Failed to sync manifest: {e}")))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.write_error(format!("Failed to rename manifest: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ProvisioningEngine for ManifestEngine {
    async fn declare_resource(&self, declaration: ResourceDeclaration) -> Result<ResourceHandle> {
        let mut pending = self.pending.lock().await;
        let handle = declaration.handle();

        if pending.iter().any(|d| d.kind == handle.kind && d.name == handle.name) {
            return Err(EngineError::DuplicateDeclaration { urn: handle.urn }.into());
        }

        let known: HashSet<String> = pending.iter().map(ResourceDeclaration::urn).collect();
        if let Some(missing) = declaration.depends_on.iter().find(|dep| !known.contains(&dep.urn)) {
            return Err(EngineError::DeclarationFailed {
                kind: declaration.kind.to_string(),
                name: declaration.name.clone(),
                message: format!("dependency {missing} has not been declared"),
            }
            .into());
        }

        debug!("Buffered {} for manifest", handle.urn);
        pending.push(declaration);
        Ok(handle)
    }

    async fn lookup_availability_zones(&self, region: &str) -> Result<Vec<String>> {
        Ok(self.lookup.availability_zones(region))
    }

    async fn lookup_hosted_zone(&self, domain: &str) -> Result<String> {
        self.lookup.hosted_zone(domain)
    }

    async fn commit(&self) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let content = self.render(&pending)?;

        self.write_atomic(&content).await?;
        info!(
            "Wrote {} declaration(s) to {}",
            pending.len(),
            self.path.display()
        );

        pending.clear();
        Ok(())
    }

    async fn abort(&self) {
        let mut pending = self.pending.lock().await;
        warn!("Discarding {} buffered declaration(s)", pending.len());
        pending.clear();
    }

    fn engine_type(&self) -> &'static str {
        "manifest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ResourceKind, Value};
    use tempfile::TempDir;

    fn declaration(
        kind: ResourceKind,
        name: &str,
        depends_on: Vec<ResourceHandle>,
        properties: BTreeMap<String, DeclaredValue>,
    ) -> ResourceDeclaration {
        ResourceDeclaration {
            kind,
            name: name.to_string(),
            properties,
            depends_on,
            wave: 0,
        }
    }

    #[tokio::test]
    async fn test_commit_writes_manifest() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("out").join("manifest.json");
        let engine = ManifestEngine::new(&path, StaticLookup::default())
            .with_stack("webapp-dev", "us-east-1", "abc123");

        let vpc = engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![], BTreeMap::new()))
            .await
            .unwrap();
        let properties = BTreeMap::from([
            (String::from("vpcId"), Value::Output(vpc.output("id"))),
            (String::from("password"), Value::Secret(String::from("hunter2"))),
        ]);
        engine
            .declare_resource(declaration(
                ResourceKind::Subnet,
                "public-subnet-0",
                vec![vpc],
                properties,
            ))
            .await
            .unwrap();

        assert!(!path.exists());
        engine.commit().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hunter2"));

        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["stack"], "webapp-dev");
        assert_eq!(json["config_hash"], "abc123");
        assert_eq!(json["declarations"][0]["urn"], "vpc::main");
        assert_eq!(json["declarations"][0]["type"], "aws:ec2/vpc:Vpc");
        assert_eq!(json["declarations"][1]["depends_on"][0], "vpc::main");
        assert_eq!(
            json["declarations"][1]["properties"]["vpcId"]["output"]["urn"],
            "vpc::main"
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_abort_writes_nothing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("manifest.json");
        let engine = ManifestEngine::new(&path, StaticLookup::default());

        engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![], BTreeMap::new()))
            .await
            .unwrap();
        engine.abort().await;

        assert!(!path.exists());
        assert!(engine.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let engine = ManifestEngine::new(dir.path().join("m.json"), StaticLookup::default());

        engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![], BTreeMap::new()))
            .await
            .unwrap();
        let result = engine
            .declare_resource(declaration(ResourceKind::Vpc, "main", vec![], BTreeMap::new()))
            .await;

        assert!(matches!(
            result,
            Err(StackError::Engine(EngineError::DuplicateDeclaration { .. }))
        ));
    }
}
