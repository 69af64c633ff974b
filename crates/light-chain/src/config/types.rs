use serde::{Deserialize, Serialize};

/// Consensus parameters consumed by the chain core and handed to the header validator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConsensusConstants {
    /// Blocks per sub-epoch. Together with the cache slack this bounds the record cache.
    pub sub_epoch_blocks: u32,
    pub sub_slot_iters_starting: u64,
    pub difficulty_starting: u64,
    pub difficulty_constant_factor: u128,
    pub number_zero_bits_plot_filter: u8,
}
