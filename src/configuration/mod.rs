pub mod batch;
pub mod engine;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::*;
pub use engine::*;
pub use store::*;
