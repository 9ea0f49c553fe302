use crate::error::MetadataError;
use crate::model::{ElementKind, ElementSet, Id, ResourceMetadata};
use crate::store::traits::ResourceCatalog;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Two resources annotate the same element differently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataConflict {
    pub element_id: String,
    pub kind: ElementKind,
    /// Resource whose annotations were kept
    pub kept_from: Uuid,
    pub conflicting_resource: Uuid,
}

/// Union of the observation and feature annotations of several resources.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataMergeReport {
    pub observation_set: ElementSet,
    pub feature_set: ElementSet,
    pub conflicts: Vec<MetadataConflict>,
    pub resources_merged: usize,
}

impl MetadataMergeReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Accumulates one kind of element set, remembering which resource each
/// element first came from.
struct SetAccumulator {
    set: ElementSet,
    origin: HashMap<String, Uuid>,
}

impl SetAccumulator {
    fn new(kind: ElementKind) -> Self {
        Self {
            set: ElementSet::empty(kind, true),
            origin: HashMap::new(),
        }
    }

    fn absorb(
        &mut self,
        resource_id: Uuid,
        incoming: &ElementSet,
        conflicts: &mut Vec<MetadataConflict>,
    ) -> Result<(), MetadataError> {
        for element in incoming.elements() {
            match self.set.get_element(element.id()) {
                Some(existing) if !existing.same_annotations(element) => {
                    let kept_from = self
                        .origin
                        .get(element.id())
                        .copied()
                        .unwrap_or(resource_id);
                    log::warn!(
                        "{} '{}' from resource {} conflicts with the copy from {}; keeping the first",
                        incoming.kind(),
                        element.id(),
                        resource_id,
                        kept_from
                    );
                    conflicts.push(MetadataConflict {
                        element_id: element.id().to_string(),
                        kind: incoming.kind(),
                        kept_from,
                        conflicting_resource: resource_id,
                    });
                }
                Some(_) => {}
                None => {
                    self.origin.insert(element.id().to_string(), resource_id);
                }
            }
        }
        // Union keeps the accumulated copy on id collisions
        self.set = self.set.set_union(incoming)?;
        Ok(())
    }
}

pub struct MetadataMerger;

impl MetadataMerger {
    /// Merge the metadata of resources in the given order. The first
    /// occurrence of an element wins.
    pub fn merge(resources: &[(Uuid, ResourceMetadata)]) -> Result<MetadataMergeReport, MetadataError> {
        let mut observations = SetAccumulator::new(ElementKind::Observation);
        let mut features = SetAccumulator::new(ElementKind::Feature);
        let mut conflicts = Vec::new();

        for (resource_id, metadata) in resources {
            if let Some(set) = &metadata.observation_set {
                observations.absorb(*resource_id, set, &mut conflicts)?;
            }
            if let Some(set) = &metadata.feature_set {
                features.absorb(*resource_id, set, &mut conflicts)?;
            }
        }

        let report = MetadataMergeReport {
            observation_set: observations.set,
            feature_set: features.set,
            conflicts,
            resources_merged: resources.len(),
        };
        log::info!(
            "Merged metadata of {} resources: {} observations, {} features, {} conflicts",
            report.resources_merged,
            report.observation_set.len(),
            report.feature_set.len(),
            report.conflicts.len()
        );
        Ok(report)
    }

    /// Merge the metadata of every resource in a workspace, oldest first.
    pub fn merge_workspace<C: ResourceCatalog + ?Sized>(
        catalog: &C,
        workspace_id: &Id,
    ) -> Result<MetadataMergeReport> {
        let resources = catalog
            .list_resources_in_workspace(workspace_id)
            .with_context(|| format!("Failed to list resources of workspace {}", workspace_id))?;

        let mut collected = Vec::with_capacity(resources.len());
        for resource in resources {
            if let Some(metadata) = catalog.get_metadata(&resource.id)? {
                collected.push((resource.id, metadata));
            }
        }

        Self::merge(&collected)
            .with_context(|| format!("Failed to merge metadata of workspace {}", workspace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, Element};
    use std::collections::BTreeMap;

    fn sample(id: &str, condition: Option<&str>) -> Element {
        let mut attributes = BTreeMap::new();
        if let Some(c) = condition {
            attributes.insert("condition".to_string(), Attribute::unrestricted_string(c));
        }
        Element::new(id, attributes).unwrap()
    }

    fn observations(elements: Vec<Element>) -> Option<ElementSet> {
        Some(ElementSet::new(ElementKind::Observation, elements, true).unwrap())
    }

    #[test]
    fn test_union_across_resources() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let genes = ElementSet::new(ElementKind::Feature, vec![Element::with_id("TP53").unwrap()], true).unwrap();

        let report = MetadataMerger::merge(&[
            (
                a,
                ResourceMetadata {
                    observation_set: observations(vec![sample("s1", None), sample("s2", None)]),
                    ..Default::default()
                },
            ),
            (
                b,
                ResourceMetadata {
                    observation_set: observations(vec![sample("s2", None), sample("s3", None)]),
                    feature_set: Some(genes),
                    parent_operation: None,
                },
            ),
        ])
        .unwrap();

        assert_eq!(report.observation_set.ids(), vec!["s1", "s2", "s3"]);
        assert_eq!(report.feature_set.ids(), vec!["TP53"]);
        assert!(!report.has_conflicts());
        assert_eq!(report.resources_merged, 2);
    }

    #[test]
    fn test_conflicting_annotations_keep_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let report = MetadataMerger::merge(&[
            (
                a,
                ResourceMetadata {
                    observation_set: observations(vec![sample("s1", Some("treated"))]),
                    ..Default::default()
                },
            ),
            (
                b,
                ResourceMetadata {
                    observation_set: observations(vec![sample("s1", Some("control"))]),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();

        assert_eq!(
            report.conflicts,
            vec![MetadataConflict {
                element_id: "s1".to_string(),
                kind: ElementKind::Observation,
                kept_from: a,
                conflicting_resource: b,
            }]
        );
        let kept = report.observation_set.get_element("s1").unwrap();
        assert!(kept.same_annotations(&sample("s1", Some("treated"))));
    }

    #[test]
    fn test_empty_input() {
        let report = MetadataMerger::merge(&[]).unwrap();
        assert!(report.observation_set.is_empty());
        assert!(report.feature_set.is_empty());
        assert_eq!(report.resources_merged, 0);
    }
}
