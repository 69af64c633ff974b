use serde::Serialize;

use crate::config::{ConsensusConstants, Network};

/// Slack added on top of a sub-epoch when sizing the block record cache.
pub const DEFAULT_CACHE_SLACK: u32 = 100;

/// The base configuration for a network.
#[derive(Serialize, Debug, Clone)]
pub struct BaseConfig {
    pub network: Network,
    pub constants: ConsensusConstants,
    pub cache_slack: u32,
}
