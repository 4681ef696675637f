//! Data models for the motorcycle catalog engine
//!
//! Catalog entities (models, model years, configurations), typed components,
//! assignments and validation reports. Everything here is plain data; the
//! store, resolver, validator and batch engine operate on these types.

pub mod assignment;
pub mod catalog;
pub mod component;
pub mod validation;

pub use assignment::*;
pub use catalog::*;
pub use component::*;
pub use validation::*;

use uuid::Uuid;

/// Generate a new UUID for record IDs
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
