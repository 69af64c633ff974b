/// Object store key of the persisted peak block.
pub const PEAK_BLOCK_KEY: &str = "PEAK_BLOCK";

/// Object store key of the last weight proof the chain was synced from.
pub const SYNCED_WEIGHT_PROOF_KEY: &str = "SYNCED_WEIGHT_PROOF";

/// Ratio between actual and reported plot space (0.762), as numerator over denominator.
pub const UI_ACTUAL_SPACE_CONSTANT_FACTOR: (u128, u128) = (762, 1000);

/// Difficulty coefficient of a farmer without a staking entry.
pub const DEFAULT_STAKING_COEFFICIENT: u64 = 20;
