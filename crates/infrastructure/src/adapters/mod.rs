//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod notifier_adapter;

pub use notifier_adapter::HttpTaskNotifier;
