use crate::model::{Id, ResourceInfo, ResourceMetadata};
use crate::store::traits::ResourceCatalog;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// One entry of a catalog snapshot file: the resource itself plus its
/// optional annotation metadata.
#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    #[serde(flatten)]
    info: ResourceInfo,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Catalog kept entirely in memory. Filled at startup (from a snapshot or
/// by hand in tests) and read concurrently afterwards.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    resources: RwLock<HashMap<Uuid, ResourceInfo>>,
    metadata: RwLock<HashMap<Uuid, ResourceMetadata>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_resources(resources: impl IntoIterator<Item = ResourceInfo>) -> Self {
        let catalog = Self::new();
        for resource in resources {
            catalog.insert(resource);
        }
        catalog
    }

    /// Load a JSON list of resources. Entries may carry a `metadata` object
    /// with `observation_set` and `feature_set` records.
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog snapshot {}", path.display()))?;
        let entries: Vec<SnapshotEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog snapshot {}", path.display()))?;

        let catalog = Self::new();
        for entry in entries {
            if let Some(raw_metadata) = &entry.metadata {
                let metadata = ResourceMetadata::from_value(raw_metadata).with_context(|| {
                    format!("Invalid metadata for resource {}", entry.info.id)
                })?;
                catalog.set_metadata(entry.info.id, metadata);
            }
            catalog.insert(entry.info);
        }

        log::info!(
            "Loaded {} resources from catalog snapshot {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn insert(&self, resource: ResourceInfo) {
        self.resources.write().insert(resource.id, resource);
    }

    pub fn set_metadata(&self, id: Uuid, metadata: ResourceMetadata) {
        self.metadata.write().insert(id, metadata);
    }

    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl ResourceCatalog for InMemoryCatalog {
    fn get_resource(&self, id: &Uuid) -> Result<Option<ResourceInfo>> {
        Ok(self.resources.read().get(id).cloned())
    }

    fn list_resources_in_workspace(&self, workspace_id: &Id) -> Result<Vec<ResourceInfo>> {
        let mut resources: Vec<ResourceInfo> = self
            .resources
            .read()
            .values()
            .filter(|r| r.belongs_to_workspace(workspace_id))
            .cloned()
            .collect();
        // Oldest first so merges are reproducible
        resources.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(resources)
    }

    fn get_metadata(&self, id: &Uuid) -> Result<Option<ResourceMetadata>> {
        Ok(self.metadata.read().get(id).cloned())
    }
}
