pub mod resolver;
pub mod sheet;

pub use resolver::*;
pub use sheet::*;
