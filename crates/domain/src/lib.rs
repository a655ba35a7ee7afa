//! Domain layer for the task service
//!
//! Contains the task entity, its value objects, and domain errors.
//! This layer has no infrastructure dependencies.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
