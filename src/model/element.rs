use crate::error::MetadataError;
use crate::model::attribute::{Attribute, AttributeRecord};
use crate::model::common::normalize_identifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// The two kinds of annotated entity. Both behave identically; the kind only
/// says which axis of a data matrix the entity describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    /// A sample (a column of an expression matrix)
    Observation,
    /// A measured feature such as a gene (a row)
    Feature,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Observation => "Observation",
            ElementKind::Feature => "Feature",
        }
    }

    pub fn set_name(&self) -> &'static str {
        match self {
            ElementKind::Observation => "ObservationSet",
            ElementKind::Feature => "FeatureSet",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Observation" => Ok(ElementKind::Observation),
            "Feature" => Ok(ElementKind::Feature),
            _ => Err(MetadataError::UnknownType(format!(
                "'{}' is not an element kind",
                s
            ))),
        }
    }
}

/// A named entity carrying typed attributes.
///
/// Equality and hashing look at the id only, so a refreshed copy of a sample
/// with different annotations is still "the same" member of an element set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "ElementRecord", try_from = "ElementRecord")]
pub struct Element {
    id: String,
    attributes: BTreeMap<String, Attribute>,
}

/// Wire form of an [`Element`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeRecord>,
}

impl Element {
    /// The id is normalized and validated before any attribute is looked at.
    pub fn new(
        raw_id: &str,
        attributes: BTreeMap<String, Attribute>,
    ) -> Result<Self, MetadataError> {
        let id = normalize_identifier(raw_id)?;
        for key in attributes.keys() {
            check_attribute_key(key)?;
        }
        Ok(Self { id, attributes })
    }

    pub fn with_id(raw_id: &str) -> Result<Self, MetadataError> {
        Self::new(raw_id, BTreeMap::new())
    }

    pub fn from_record(record: &ElementRecord) -> Result<Self, MetadataError> {
        let id = normalize_identifier(&record.id)?;
        let mut attributes = BTreeMap::new();
        for (key, attr_record) in &record.attributes {
            check_attribute_key(key)?;
            let attribute = Attribute::from_record(attr_record)
                .map_err(|e| e.in_context(format!("element '{}', attribute '{}'", id, key)))?;
            attributes.insert(key.clone(), attribute);
        }
        Ok(Self { id, attributes })
    }

    pub fn from_value(raw: &Value) -> Result<Self, MetadataError> {
        let record: ElementRecord = serde_json::from_value(raw.clone())
            .map_err(|e| MetadataError::MalformedValue(format!("bad element record: {}", e)))?;
        Self::from_record(&record)
    }

    pub fn to_record(&self) -> ElementRecord {
        ElementRecord {
            id: self.id.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_record()))
                .collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn get_attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    /// Build an attribute from its raw record and store it under `key`.
    ///
    /// Fails with `DuplicateKey` when `key` exists and `overwrite` is false.
    /// The element is left untouched on any failure.
    pub fn add_attribute(
        &mut self,
        key: &str,
        raw_attribute: &Value,
        overwrite: bool,
    ) -> Result<(), MetadataError> {
        let attribute = Attribute::from_value(raw_attribute)
            .map_err(|e| e.in_context(format!("attribute '{}'", key)))?;
        self.insert_attribute(key, attribute, overwrite)
    }

    pub fn insert_attribute(
        &mut self,
        key: &str,
        attribute: Attribute,
        overwrite: bool,
    ) -> Result<(), MetadataError> {
        check_attribute_key(key)?;
        if !overwrite && self.attributes.contains_key(key) {
            return Err(MetadataError::DuplicateKey(format!(
                "element '{}' already has attribute '{}'",
                self.id, key
            )));
        }
        self.attributes.insert(key.to_string(), attribute);
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Attribute> {
        self.attributes.remove(key)
    }

    /// True when both id and every attribute agree, unlike `==` which only
    /// compares ids.
    pub fn same_annotations(&self, other: &Element) -> bool {
        self.id == other.id && self.attributes == other.attributes
    }
}

fn check_attribute_key(key: &str) -> Result<(), MetadataError> {
    if key.trim().is_empty() {
        return Err(MetadataError::MalformedValue(
            "attribute keys must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// Hash/Eq only look at the id, so sets of elements can be looked up by id.
impl Borrow<str> for Element {
    fn borrow(&self) -> &str {
        &self.id
    }
}

impl From<Element> for ElementRecord {
    fn from(element: Element) -> Self {
        element.to_record()
    }
}

impl TryFrom<ElementRecord> for Element {
    type Error = MetadataError;

    fn try_from(record: ElementRecord) -> Result<Self, Self::Error> {
        Element::from_record(&record)
    }
}
