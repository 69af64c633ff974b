pub mod block_records;
pub mod chain_view;
pub mod constants;
pub mod fork;
pub mod height_index;
pub mod network_space;
pub mod peak;
pub mod validator;

mod header_chain;
pub use crate::consensus::header_chain::*;
