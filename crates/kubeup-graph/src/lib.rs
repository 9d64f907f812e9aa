//! Walks the tree the composer builds and runs each Unit in pre-order
//! (spec §5 Run), resolving cross-Unit references as it goes and checking
//! the tree's static shape before it ever touches a cloud.

mod error;
mod validate;

pub use error::GraphError;
pub use validate::{assign_paths, run_tree, validate, GraphNode};
