//! Application layer - Use cases and orchestration
//!
//! Defines the ports the infrastructure implements and the task service
//! that orchestrates persistence and outbound notification.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
