use crate::error::{FieldError, MetadataError};
use crate::model::{generate_id, FieldSpec, FieldSpecRecord, ResourceTypeRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// One declared input of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub spec: FieldSpec,
}

/// One declared output of an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSpec {
    pub required: bool,
    pub spec: FieldSpec,
}

/// An ingested pipeline definition. Every input and output spec has been
/// validated, so a submission can only fail on the submitted values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDef {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inputs: BTreeMap<String, InputSpec>,
    pub outputs: BTreeMap<String, OutputSpec>,
    pub created_at: DateTime<Utc>,
}

/// Declarative form of an operation, as shipped with a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Optional ID - if not provided, one is generated at ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpecRecord>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputSpecRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpecRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    pub spec: FieldSpecRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpecRecord {
    #[serde(default = "default_true")]
    pub required: bool,
    pub spec: FieldSpecRecord,
}

impl OperationDef {
    /// Turn a declarative record into an operation, building every field spec.
    /// The first malformed spec fails the whole ingestion, reported against
    /// `inputs.<key>` or `outputs.<key>`.
    pub fn ingest(
        record: &OperationRecord,
        registry: &ResourceTypeRegistry,
    ) -> Result<Self, FieldError> {
        if record.name.trim().is_empty() {
            return Err(FieldError::new(
                "name",
                MetadataError::MalformedValue("operation name must not be empty".to_string()),
            ));
        }

        let mut inputs = BTreeMap::new();
        for (key, input) in &record.inputs {
            let field = format!("inputs.{}", key);
            check_field_key(key).map_err(|e| FieldError::new(&field, e))?;
            let spec = FieldSpec::from_record(&input.spec, registry)
                .map_err(|e| FieldError::new(&field, e))?;
            let name = if input.name.is_empty() {
                key.clone()
            } else {
                input.name.clone()
            };
            inputs.insert(
                key.clone(),
                InputSpec {
                    name,
                    description: input.description.clone(),
                    required: input.required,
                    spec,
                },
            );
        }

        let mut outputs = BTreeMap::new();
        for (key, output) in &record.outputs {
            let field = format!("outputs.{}", key);
            check_field_key(key).map_err(|e| FieldError::new(&field, e))?;
            let spec = FieldSpec::from_record(&output.spec, registry)
                .map_err(|e| FieldError::new(&field, e))?;
            outputs.insert(
                key.clone(),
                OutputSpec {
                    required: output.required,
                    spec,
                },
            );
        }

        Ok(Self {
            id: record.id.unwrap_or_else(generate_id),
            name: record.name.clone(),
            description: record.description.clone(),
            inputs,
            outputs,
            created_at: Utc::now(),
        })
    }

    pub fn input(&self, key: &str) -> Option<&InputSpec> {
        self.inputs.get(key)
    }

    pub fn output(&self, key: &str) -> Option<&OutputSpec> {
        self.outputs.get(key)
    }

    pub fn required_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter(|(_, input)| input.required)
            .map(|(key, _)| key.as_str())
    }
}

fn check_field_key(key: &str) -> Result<(), MetadataError> {
    if key.trim().is_empty() {
        return Err(MetadataError::MalformedValue(
            "field keys must not be empty".to_string(),
        ));
    }
    Ok(())
}
