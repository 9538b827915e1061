//! Department service domain.

pub mod fallback;
pub mod store;
pub mod types;

pub use fallback::DepartmentFallback;
pub use store::{DepartmentStore, LocalDepartments};
pub use types::{Department, DepartmentDto, NewDepartment};
