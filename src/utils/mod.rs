//! Shared utilities.

mod dot;
pub mod graph;

pub use dot::{escape_dot, DotWriter};
