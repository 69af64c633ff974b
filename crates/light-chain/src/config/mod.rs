mod base;
pub mod client_config;
pub mod networks;
mod types;

pub use base::BaseConfig;
pub use client_config::Config;
pub use networks::Network;
pub use types::ConsensusConstants;
