use std::collections::HashMap;

use alloy_primitives::{FixedBytes, B256};

use crate::{
    config::ConsensusConstants,
    consensus::{
        chain_view::BlockchainInterface,
        constants::{DEFAULT_STAKING_COEFFICIENT, UI_ACTUAL_SPACE_CONSTANT_FACTOR},
    },
    errors::ChainError,
};

/// Serialized BLS public key of a farmer.
pub type FarmerPublicKey = FixedBytes<48>;

/// Estimates the total plot space in bytes that produced the blocks between `older` and
/// `newer`.
pub fn network_space(
    chain: &dyn BlockchainInterface,
    constants: &ConsensusConstants,
    newer: &B256,
    older: &B256,
) -> Result<u128, ChainError> {
    let newer = chain.block_record(newer)?;
    let older = chain.block_record(older)?;

    let delta_weight = newer.weight.saturating_sub(older.weight);
    let delta_iters = newer.total_iters.saturating_sub(older.total_iters);
    if delta_iters == 0 {
        return Err(ChainError::EmptyIterationRange);
    }

    let (factor_numerator, factor_denominator) = UI_ACTUAL_SPACE_CONSTANT_FACTOR;
    let eligible_plots_filter_multiplier = 1u128
        .checked_shl(constants.number_zero_bits_plot_filter.into())
        .ok_or(ChainError::NetworkSpaceOverflow)?;
    let numerator = delta_weight
        .checked_mul(constants.difficulty_constant_factor)
        .and_then(|value| value.checked_mul(eligible_plots_filter_multiplier))
        .and_then(|value| value.checked_mul(factor_numerator))
        .ok_or(ChainError::NetworkSpaceOverflow)?;
    let denominator = delta_iters
        .checked_mul(factor_denominator)
        .ok_or(ChainError::NetworkSpaceOverflow)?;
    Ok(numerator / denominator)
}

/// Per-farmer difficulty coefficients derived from staking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakingCoefficients {
    coefficients: HashMap<FarmerPublicKey, u64>,
}

impl StakingCoefficients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coefficient of `farmer`, or `DEFAULT_STAKING_COEFFICIENT` if it has no entry.
    pub fn coefficient(&self, farmer: &FarmerPublicKey) -> u64 {
        self.coefficients
            .get(farmer)
            .copied()
            .unwrap_or(DEFAULT_STAKING_COEFFICIENT)
    }

    pub fn set(&mut self, farmer: FarmerPublicKey, coefficient: u64) {
        self.coefficients.insert(farmer, coefficient);
    }

    pub fn remove(&mut self, farmer: &FarmerPublicKey) -> Option<u64> {
        self.coefficients.remove(farmer)
    }
}
