//! Motorcycle catalog engine
//!
//! Resolves effective spec values for configurations, manages component
//! assignments, validates configurations for completeness and propagates
//! changes across many configurations or model years.

pub mod assignment;
pub mod cli;
pub mod configuration;
pub mod models;
pub mod resolution;
pub mod settings;
pub mod validation;
