use itertools::Itertools;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while constructing attributes, elements, element sets and
/// field specs, or while validating a submitted value against a field spec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    /// Wrong primitive kind, unparsable literal or structurally bad record
    #[error("malformed value: {0}")]
    MalformedValue(String),

    /// Numeric bound or option membership violated
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// Attribute key or element id collision
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// `multiple=false` with more than one member, or list/scalar arity mismatch
    #[error("cardinality violation: {0}")]
    CardinalityViolation(String),

    /// Variant tag or resource type tag not in the registry
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("resource {resource_id} cannot be used: {reason}")]
    ReferenceResolutionFailed {
        resource_id: Uuid,
        reason: ReferenceFailure,
    },

    #[error("a value is required")]
    MissingRequiredField,
}

/// Why a referenced resource was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFailure {
    NotFound,
    NotOwned { owner: String },
    OutsideWorkspace { workspace_id: String },
    DisallowedType { resource_type: Option<String> },
    Inactive,
    LookupFailed(String),
}

impl fmt::Display for ReferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceFailure::NotFound => write!(f, "no such resource"),
            ReferenceFailure::NotOwned { owner } => {
                write!(f, "resource is owned by '{}'", owner)
            }
            ReferenceFailure::OutsideWorkspace { workspace_id } => {
                write!(f, "resource is not part of workspace '{}'", workspace_id)
            }
            ReferenceFailure::DisallowedType { resource_type } => match resource_type {
                Some(t) => write!(f, "resource type '{}' is not accepted here", t),
                None => write!(f, "resource has no validated type"),
            },
            ReferenceFailure::Inactive => {
                write!(f, "resource is not active (validation may be in progress)")
            }
            ReferenceFailure::LookupFailed(msg) => write!(f, "catalog lookup failed: {}", msg),
        }
    }
}

impl MetadataError {
    /// Prefix the message with where the failure happened, e.g. an attribute
    /// key or the `default` of a field spec.
    pub fn in_context(self, context: impl fmt::Display) -> Self {
        match self {
            MetadataError::MalformedValue(msg) => {
                MetadataError::MalformedValue(format!("{}: {}", context, msg))
            }
            MetadataError::OutOfBounds(msg) => {
                MetadataError::OutOfBounds(format!("{}: {}", context, msg))
            }
            MetadataError::InvalidIdentifier { identifier, reason } => {
                MetadataError::InvalidIdentifier {
                    identifier,
                    reason: format!("{}: {}", context, reason),
                }
            }
            MetadataError::DuplicateKey(msg) => {
                MetadataError::DuplicateKey(format!("{}: {}", context, msg))
            }
            MetadataError::CardinalityViolation(msg) => {
                MetadataError::CardinalityViolation(format!("{}: {}", context, msg))
            }
            MetadataError::UnknownType(msg) => {
                MetadataError::UnknownType(format!("{}: {}", context, msg))
            }
            other => other,
        }
    }
}

/// A [`MetadataError`] reported against the field it originated from.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {error}")]
pub struct FieldError {
    pub field: String,
    pub error: MetadataError,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: MetadataError) -> Self {
        Self {
            field: field.into(),
            error,
        }
    }
}

/// Every field that failed during one validation pass, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("{} field(s) failed validation: {}", .errors.len(), summarize(.errors))]
pub struct InputErrors {
    pub errors: BTreeMap<String, MetadataError>,
}

fn summarize(errors: &BTreeMap<String, MetadataError>) -> String {
    errors
        .iter()
        .map(|(field, error)| format!("{} ({})", field, error))
        .join("; ")
}

impl InputErrors {
    pub fn insert(&mut self, field: impl Into<String>, error: MetadataError) {
        self.errors.insert(field.into(), error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&MetadataError> {
        self.errors.get(field)
    }
}

impl From<FieldError> for InputErrors {
    fn from(err: FieldError) -> Self {
        let mut errors = InputErrors::default();
        errors.insert(err.field, err.error);
        errors
    }
}

/// Serialized as `{ "<field>": "<message>", ... }` for API payloads.
impl Serialize for InputErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for (field, error) in &self.errors {
            map.serialize_entry(field, &error.to_string())?;
        }
        map.end()
    }
}
