pub mod attribute;
pub mod common;
pub mod element;
pub mod element_set;
pub mod field_spec;
pub mod operation;
pub mod resource;
pub mod user_context;

pub use attribute::*;
pub use common::*;
pub use element::*;
pub use element_set::*;
pub use field_spec::*;
pub use operation::*;
pub use resource::*;
pub use user_context::*;
