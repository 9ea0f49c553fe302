use crate::error::{FieldError, MetadataError};
use crate::model::{OperationDef, OperationRecord, ResourceTypeRegistry};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Ingested operations keyed by id. Written when a pipeline is ingested,
/// read by every submission afterwards.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: RwLock<HashMap<Uuid, Arc<OperationDef>>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the operation from its record and register it. An id that is
    /// already registered is a `DuplicateKey` error and leaves the registry
    /// unchanged.
    pub fn ingest(
        &self,
        record: &OperationRecord,
        registry: &ResourceTypeRegistry,
    ) -> Result<Arc<OperationDef>, FieldError> {
        let operation = Arc::new(OperationDef::ingest(record, registry)?);

        let mut operations = self.operations.write();
        if operations.contains_key(&operation.id) {
            return Err(FieldError::new(
                "id",
                MetadataError::DuplicateKey(format!(
                    "operation {} is already registered",
                    operation.id
                )),
            ));
        }
        operations.insert(operation.id, Arc::clone(&operation));

        log::info!(
            "Ingested operation '{}' ({}) with {} inputs and {} outputs",
            operation.name,
            operation.id,
            operation.inputs.len(),
            operation.outputs.len()
        );
        Ok(operation)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<OperationDef>> {
        self.operations.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}
