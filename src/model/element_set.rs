use crate::error::MetadataError;
use crate::model::element::{Element, ElementKind, ElementRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

fn default_multiple() -> bool {
    true
}

/// A deduplicated collection of elements of one kind.
///
/// Membership is decided by element id. Inserting a second element with an
/// existing id is an error rather than a silent merge, and a set flagged
/// `multiple = false` never holds more than one element.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "ElementSetRecord")]
pub struct ElementSet {
    kind: ElementKind,
    multiple: bool,
    elements: HashSet<Element>,
}

/// Wire form of an [`ElementSet`]. The kind is not part of the record; it is
/// supplied by whoever knows which axis the set describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSetRecord {
    #[serde(default = "default_multiple")]
    pub multiple: bool,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
}

impl ElementSet {
    pub fn new(
        kind: ElementKind,
        elements: Vec<Element>,
        multiple: bool,
    ) -> Result<Self, MetadataError> {
        let mut set = Self::empty(kind, multiple);
        for element in elements {
            set.add_element(element)?;
        }
        Ok(set)
    }

    pub fn empty(kind: ElementKind, multiple: bool) -> Self {
        Self {
            kind,
            multiple,
            elements: HashSet::new(),
        }
    }

    pub fn from_record(kind: ElementKind, record: &ElementSetRecord) -> Result<Self, MetadataError> {
        let elements = record
            .elements
            .iter()
            .map(Element::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(kind, elements, record.multiple)
    }

    pub fn from_value(kind: ElementKind, raw: &Value) -> Result<Self, MetadataError> {
        let record: ElementSetRecord = serde_json::from_value(raw.clone()).map_err(|e| {
            MetadataError::MalformedValue(format!("bad {} record: {}", kind.set_name(), e))
        })?;
        Self::from_record(kind, &record)
    }

    /// Elements are emitted sorted by id so that stored records are stable.
    pub fn to_record(&self) -> ElementSetRecord {
        ElementSetRecord {
            multiple: self.multiple,
            elements: self.elements().into_iter().map(Element::to_record).collect(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn multiple(&self) -> bool {
        self.multiple
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains(id)
    }

    pub fn get_element(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Members sorted by id
    pub fn elements(&self) -> Vec<&Element> {
        let mut elements: Vec<&Element> = self.elements.iter().collect();
        elements.sort_by(|a, b| a.id().cmp(b.id()));
        elements
    }

    pub fn ids(&self) -> Vec<&str> {
        self.elements().into_iter().map(Element::id).collect()
    }

    pub fn add_element(&mut self, element: Element) -> Result<(), MetadataError> {
        if self.elements.contains(element.id()) {
            return Err(MetadataError::DuplicateKey(format!(
                "{} already contains '{}'",
                self.kind.set_name(),
                element.id()
            )));
        }
        if !self.multiple && !self.elements.is_empty() {
            return Err(MetadataError::CardinalityViolation(format!(
                "{} with multiple=false holds at most one element",
                self.kind.set_name()
            )));
        }
        self.elements.insert(element);
        Ok(())
    }

    pub fn set_multiple(&mut self, multiple: bool) -> Result<(), MetadataError> {
        if !multiple && self.elements.len() > 1 {
            return Err(MetadataError::CardinalityViolation(format!(
                "cannot set multiple=false on a set of {} elements",
                self.elements.len()
            )));
        }
        self.multiple = multiple;
        Ok(())
    }

    /// Members of either set. Where both hold the same id, this set's copy
    /// is kept.
    pub fn set_union(&self, other: &ElementSet) -> Result<ElementSet, MetadataError> {
        self.check_same_kind(other)?;
        let mut elements = self.elements.clone();
        for element in &other.elements {
            if !elements.contains(element) {
                elements.insert(element.clone());
            }
        }
        Ok(self.derived(elements))
    }

    /// Members of this set whose id is also in `other`
    pub fn set_intersection(&self, other: &ElementSet) -> Result<ElementSet, MetadataError> {
        self.check_same_kind(other)?;
        let elements = self
            .elements
            .iter()
            .filter(|e| other.elements.contains(*e))
            .cloned()
            .collect();
        Ok(self.derived(elements))
    }

    /// Members of this set whose id is not in `other`
    pub fn set_difference(&self, other: &ElementSet) -> Result<ElementSet, MetadataError> {
        self.check_same_kind(other)?;
        let elements = self
            .elements
            .difference(&other.elements)
            .cloned()
            .collect();
        Ok(self.derived(elements))
    }

    pub fn is_proper_subset_of(&self, other: &ElementSet) -> bool {
        self.kind == other.kind
            && self.elements.len() < other.elements.len()
            && self.elements.is_subset(&other.elements)
    }

    pub fn is_proper_superset_of(&self, other: &ElementSet) -> bool {
        other.is_proper_subset_of(self)
    }

    /// Stricter than `==`: the same ids, and each member carries identical
    /// attributes in both sets.
    pub fn is_equivalent_to(&self, other: &ElementSet) -> bool {
        self == other
            && self.elements.iter().all(|e| {
                other
                    .elements
                    .get(e.id())
                    .is_some_and(|o| e.same_annotations(o))
            })
    }

    fn check_same_kind(&self, other: &ElementSet) -> Result<(), MetadataError> {
        if self.kind != other.kind {
            return Err(MetadataError::MalformedValue(format!(
                "cannot combine an {} with a {}",
                self.kind.set_name(),
                other.kind.set_name()
            )));
        }
        Ok(())
    }

    fn derived(&self, elements: HashSet<Element>) -> ElementSet {
        ElementSet {
            kind: self.kind,
            multiple: elements.len() > 1,
            elements,
        }
    }
}

/// Same kind and the same member ids. Attributes and the `multiple` flag
/// are ignored; see [`ElementSet::is_equivalent_to`].
impl PartialEq for ElementSet {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.elements == other.elements
    }
}

impl From<ElementSet> for ElementSetRecord {
    fn from(set: ElementSet) -> Self {
        set.to_record()
    }
}
