#![warn(clippy::uninlined_format_args)]
#![warn(clippy::unwrap_used)]
mod node;
pub use crate::node::*;

pub mod config;
pub mod consensus;
pub mod database;
pub mod errors;
pub mod test_utils;
pub mod types;
