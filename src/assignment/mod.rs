pub mod manager;

pub use manager::{AssignmentError, AssignmentManager};
