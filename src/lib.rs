pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

pub use error::{FieldError, InputErrors, MetadataError, ReferenceFailure};

// Export logic types
pub use logic::{
    InputValidator, MetadataConflict, MetadataMergeReport, MetadataMerger, ValidatedValues,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{InMemoryCatalog, OperationRegistry, ResourceCatalog};
