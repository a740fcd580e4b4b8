//! HTTP handlers, one module per resource.

pub mod auth;
pub mod complaints;
pub mod drugs;
pub mod health;
