use crate::error::{InputErrors, MetadataError, ReferenceFailure};
use crate::model::{FieldSpec, FieldValue, OperationDef, UserContext};
use crate::store::traits::ResourceCatalog;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Canonical values of an accepted submission, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedValues {
    values: BTreeMap<String, FieldValue>,
}

impl ValidatedValues {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What to do with one declared field given the submitted payload.
#[derive(Debug)]
enum Disposition<'v> {
    MissingRequired,
    UseDefault(&'v Value),
    Validate(&'v Value),
    AcceptNull,
}

impl<'v> Disposition<'v> {
    fn decide(spec: &'v FieldSpec, required: bool, raw: Option<&'v Value>) -> Self {
        match raw {
            Some(value) if !value.is_null() => Disposition::Validate(value),
            // Absent and explicit null are treated the same
            _ => match spec.default() {
                Some(default) => Disposition::UseDefault(default),
                None if required => Disposition::MissingRequired,
                None => Disposition::AcceptNull,
            },
        }
    }
}

/// Which checks a referenced resource has to pass.
#[derive(Debug, Clone, Copy)]
enum ReferenceScope<'c> {
    /// Inputs: the submitter must own the resource and it must sit in the
    /// submission's workspace
    Submission(&'c UserContext),
    /// Outputs were created by the job itself, so only existence and type
    /// are checked
    Output,
}

/// Validates submitted job inputs (and produced outputs) against an
/// operation's field specs, resolving resource references in the catalog.
pub struct InputValidator<'a, C: ResourceCatalog + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: ResourceCatalog + ?Sized> InputValidator<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Validate a full submission. Every field is evaluated; all failures
    /// come back together keyed by field name.
    pub fn validate_submission(
        &self,
        operation: &OperationDef,
        payload: &Map<String, Value>,
        context: &UserContext,
    ) -> Result<ValidatedValues, InputErrors> {
        let mut errors = InputErrors::default();
        Self::reject_unknown_keys(payload, operation.inputs.keys(), "input", operation, &mut errors);

        let scope = ReferenceScope::Submission(context);
        let mut values = BTreeMap::new();
        for (key, input) in &operation.inputs {
            match self.check_field(key, &input.spec, input.required, payload.get(key), scope) {
                Ok(value) => {
                    values.insert(key.clone(), value);
                }
                Err(error) => errors.insert(key.clone(), error),
            }
        }

        if errors.is_empty() {
            log::debug!(
                "Submission for operation '{}' by user {} accepted",
                operation.name,
                context.user_id
            );
            Ok(ValidatedValues { values })
        } else {
            log::debug!(
                "Submission for operation '{}' by user {} rejected: {}",
                operation.name,
                context.user_id,
                errors
            );
            Err(errors)
        }
    }

    /// Validate the values a finished job produced against the operation's
    /// output specs.
    pub fn validate_outputs(
        &self,
        operation: &OperationDef,
        produced: &Map<String, Value>,
    ) -> Result<ValidatedValues, InputErrors> {
        let mut errors = InputErrors::default();
        Self::reject_unknown_keys(produced, operation.outputs.keys(), "output", operation, &mut errors);

        let mut values = BTreeMap::new();
        for (key, output) in &operation.outputs {
            match self.check_field(
                key,
                &output.spec,
                output.required,
                produced.get(key),
                ReferenceScope::Output,
            ) {
                Ok(value) => {
                    values.insert(key.clone(), value);
                }
                Err(error) => errors.insert(key.clone(), error),
            }
        }

        if errors.is_empty() {
            Ok(ValidatedValues { values })
        } else {
            Err(errors)
        }
    }

    /// Validate a single submitted value against a spec on behalf of `context`.
    pub fn validate_field(
        &self,
        spec: &FieldSpec,
        required: bool,
        raw: Option<&Value>,
        context: &UserContext,
    ) -> Result<FieldValue, MetadataError> {
        self.check_field("<field>", spec, required, raw, ReferenceScope::Submission(context))
    }

    fn check_field(
        &self,
        key: &str,
        spec: &FieldSpec,
        required: bool,
        raw: Option<&Value>,
        scope: ReferenceScope<'_>,
    ) -> Result<FieldValue, MetadataError> {
        let disposition = Disposition::decide(spec, required, raw);
        log::debug!("Field '{}' ({}): {:?}", key, spec.field_type(), disposition);

        match disposition {
            Disposition::MissingRequired => Err(MetadataError::MissingRequiredField),
            Disposition::AcceptNull => Ok(FieldValue::Null),
            // Defaults were checked at ingestion and reference fields have none
            Disposition::UseDefault(default) => spec.instantiate(default),
            Disposition::Validate(value) => {
                let built = spec.instantiate(value)?;
                if spec.is_resource_reference() {
                    self.resolve_references(key, spec, &built, scope)?;
                }
                Ok(built)
            }
        }
    }

    /// Every referenced resource has to pass; the first failure rejects the
    /// whole field.
    fn resolve_references(
        &self,
        key: &str,
        spec: &FieldSpec,
        value: &FieldValue,
        scope: ReferenceScope<'_>,
    ) -> Result<(), MetadataError> {
        let ids = value
            .as_attribute()
            .and_then(|a| a.value())
            .map(|v| v.resource_ids())
            .unwrap_or_default();

        for resource_id in ids {
            if let Err(reason) = self.resolve_reference(&resource_id, spec, scope) {
                log::warn!(
                    "Field '{}' references resource {} which cannot be used: {}",
                    key,
                    resource_id,
                    reason
                );
                return Err(MetadataError::ReferenceResolutionFailed {
                    resource_id,
                    reason,
                });
            }
        }
        Ok(())
    }

    fn resolve_reference(
        &self,
        resource_id: &Uuid,
        spec: &FieldSpec,
        scope: ReferenceScope<'_>,
    ) -> Result<(), ReferenceFailure> {
        let resource = self
            .catalog
            .get_resource(resource_id)
            .map_err(|e| ReferenceFailure::LookupFailed(e.to_string()))?
            .ok_or(ReferenceFailure::NotFound)?;

        if let ReferenceScope::Submission(context) = scope {
            if resource.owner != context.user_id {
                return Err(ReferenceFailure::NotOwned {
                    owner: resource.owner.clone(),
                });
            }
            if !resource.belongs_to_workspace(&context.workspace_id) {
                return Err(ReferenceFailure::OutsideWorkspace {
                    workspace_id: context.workspace_id.clone(),
                });
            }
        }

        match resource.resource_type.as_deref() {
            Some(t) if spec.accepts_resource_type(t) => {}
            other => {
                return Err(ReferenceFailure::DisallowedType {
                    resource_type: other.map(str::to_string),
                })
            }
        }

        if matches!(scope, ReferenceScope::Submission(_)) && !resource.is_active {
            return Err(ReferenceFailure::Inactive);
        }
        Ok(())
    }

    fn reject_unknown_keys<'k>(
        payload: &Map<String, Value>,
        declared: impl Iterator<Item = &'k String>,
        role: &str,
        operation: &OperationDef,
        errors: &mut InputErrors,
    ) {
        let declared: Vec<&String> = declared.collect();
        for key in payload.keys().filter(|k| !declared.contains(k)) {
            errors.insert(
                key.clone(),
                MetadataError::UnknownType(format!(
                    "'{}' is not an {} of operation '{}'",
                    key, role, operation.name
                )),
            );
        }
    }
}
