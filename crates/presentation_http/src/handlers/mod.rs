//! HTTP request handlers

pub mod fallback;
pub mod tasks;
