//! User service domain.

pub mod repository;
pub mod service;
pub mod types;

pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::{UserError, UserService};
pub use types::{NewUser, ResponseDto, User, UserDto};
