//! Configuration completeness scoring and issue reporting

pub mod engine;

pub use engine::*;
