//! Evia API Library
//!
//! HTTP handlers, the authenticated-user extractor and application setup.

pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod state;

pub use error::{ApiResponse, HttpAppError};
