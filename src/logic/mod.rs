pub mod input_validation;
pub mod metadata_merge;

pub use input_validation::*;
pub use metadata_merge::*;
