use crate::error::MetadataError;
use crate::model::{ElementKind, ElementSet, ElementSetRecord, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Resource types known out of the box, with a human readable label.
pub const DEFAULT_RESOURCE_TYPES: &[(&str, &str)] = &[
    ("MTX", "Numeric table"),
    ("I_MTX", "Integer table"),
    ("EXP_MTX", "Expression matrix"),
    ("RNASEQ_COUNT_MTX", "RNA-seq count matrix"),
    ("NETWORK_DESCRIPTOR", "Network descriptor"),
    ("ANN", "Annotation table"),
    ("FT", "Feature table"),
    ("BED", "BED-format file"),
    ("JSON", "JSON data"),
    ("FASTA", "Sequence file (FASTA)"),
    ("FASTQ", "Sequence reads (FASTQ)"),
    ("BAM", "Aligned reads (BAM)"),
];

/// Process-wide set of resource type tags. Built once at startup and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeRegistry {
    types: BTreeMap<String, String>,
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESOURCE_TYPES
                .iter()
                .map(|(tag, label)| (tag.to_string(), label.to_string())),
        )
    }
}

impl ResourceTypeRegistry {
    pub fn new(types: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }

    /// Registry from bare tags; each tag doubles as its own label
    pub fn from_tags<S: AsRef<str>>(tags: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            tags.into_iter()
                .map(|t| (t.as_ref().to_string(), t.as_ref().to_string())),
        )
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    pub fn label(&self, tag: &str) -> Option<&str> {
        self.types.get(tag).map(String::as_str)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn check(&self, tag: &str) -> Result<(), MetadataError> {
        if self.contains(tag) {
            Ok(())
        } else {
            Err(MetadataError::UnknownType(format!(
                "'{}' is not a registered resource type",
                tag
            )))
        }
    }
}

fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

/// What the resource catalog knows about one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub owner: Id,
    /// Workspaces the resource has been added to
    #[serde(default)]
    pub workspaces: Vec<Id>,
    /// `None` until the resource has passed type validation
    #[serde(default)]
    pub resource_type: Option<String>,
    /// False while the resource is being validated or otherwise busy
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ResourceInfo {
    pub fn new(id: Uuid, owner: impl Into<Id>, resource_type: Option<&str>) -> Self {
        Self {
            id,
            name: String::new(),
            owner: owner.into(),
            workspaces: Vec::new(),
            resource_type: resource_type.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn in_workspace(mut self, workspace_id: impl Into<Id>) -> Self {
        self.workspaces.push(workspace_id.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn belongs_to_workspace(&self, workspace_id: &str) -> bool {
        self.workspaces.iter().any(|w| w == workspace_id)
    }
}

/// Sample and feature annotations extracted from one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_set: Option<ElementSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_set: Option<ElementSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_operation: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResourceMetadataRecord {
    #[serde(default)]
    observation_set: Option<ElementSetRecord>,
    #[serde(default)]
    feature_set: Option<ElementSetRecord>,
    #[serde(default)]
    parent_operation: Option<Uuid>,
}

impl ResourceMetadata {
    pub fn from_value(raw: &Value) -> Result<Self, MetadataError> {
        let record: ResourceMetadataRecord = serde_json::from_value(raw.clone())
            .map_err(|e| MetadataError::MalformedValue(format!("bad metadata record: {}", e)))?;

        let observation_set = record
            .observation_set
            .as_ref()
            .map(|r| ElementSet::from_record(ElementKind::Observation, r))
            .transpose()
            .map_err(|e| e.in_context("observation_set"))?;
        let feature_set = record
            .feature_set
            .as_ref()
            .map(|r| ElementSet::from_record(ElementKind::Feature, r))
            .transpose()
            .map_err(|e| e.in_context("feature_set"))?;

        Ok(Self {
            observation_set,
            feature_set,
            parent_operation: record.parent_operation,
        })
    }
}
