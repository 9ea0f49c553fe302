pub mod memory;
pub mod operation_registry;
pub mod traits;

pub use memory::*;
pub use operation_registry::*;
pub use traits::*;
