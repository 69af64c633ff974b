use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::config::{base::DEFAULT_CACHE_SLACK, BaseConfig, ConsensusConstants};

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    EnumIter,
    Display,
    Hash,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Simulator,
}

impl Network {
    pub fn to_base_config(self) -> BaseConfig {
        match self {
            Self::Mainnet => mainnet(),
            Self::Testnet => testnet(),
            Self::Simulator => simulator(),
        }
    }
}

pub fn mainnet() -> BaseConfig {
    BaseConfig {
        network: Network::Mainnet,
        constants: ConsensusConstants {
            sub_epoch_blocks: 384,
            sub_slot_iters_starting: 1 << 27,
            difficulty_starting: 7,
            difficulty_constant_factor: 1 << 67,
            number_zero_bits_plot_filter: 9,
        },
        cache_slack: DEFAULT_CACHE_SLACK,
    }
}

pub fn testnet() -> BaseConfig {
    BaseConfig {
        network: Network::Testnet,
        constants: ConsensusConstants {
            sub_epoch_blocks: 384,
            sub_slot_iters_starting: 1 << 27,
            difficulty_starting: 30,
            difficulty_constant_factor: 10_052_721_566_054,
            number_zero_bits_plot_filter: 9,
        },
        cache_slack: DEFAULT_CACHE_SLACK,
    }
}

/// Small sub-epochs so reorgs across the whole cache can be exercised cheaply.
pub fn simulator() -> BaseConfig {
    BaseConfig {
        network: Network::Simulator,
        constants: ConsensusConstants {
            sub_epoch_blocks: 20,
            sub_slot_iters_starting: 1 << 10,
            difficulty_starting: 1,
            difficulty_constant_factor: 1 << 14,
            number_zero_bits_plot_filter: 1,
        },
        cache_slack: 10,
    }
}
