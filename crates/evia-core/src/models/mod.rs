//! Data models for the application
//!
//! Persistent entities and the request/response DTOs exchanged with clients,
//! organized by domain.

mod complaint;
mod drug;
mod one_time_code;
mod user;

pub use complaint::*;
pub use drug::*;
pub use one_time_code::*;
pub use user::*;
