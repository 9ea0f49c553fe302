use crate::model::{Id, ResourceInfo, ResourceMetadata};
use anyhow::Result;
use uuid::Uuid;

/// Read-only view of the resource catalog used while validating submissions.
pub trait ResourceCatalog: Send + Sync {
    fn get_resource(&self, id: &Uuid) -> Result<Option<ResourceInfo>>;
    fn list_resources_in_workspace(&self, workspace_id: &Id) -> Result<Vec<ResourceInfo>>;
    fn get_metadata(&self, id: &Uuid) -> Result<Option<ResourceMetadata>>;
}
