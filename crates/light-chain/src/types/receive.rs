use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Classification of a block handed to the header chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReceiveBlockResult {
    /// The block became the new peak.
    NewPeak,
    /// The block is valid and stored for fork resolution, but is not heavier than the peak.
    AddedAsOrphan,
    /// The block failed validation. An `ErrorCode` accompanies this outcome.
    InvalidBlock,
    /// The block is already on the canonical chain.
    AlreadyHaveBlock,
    /// The parent of the block is unknown.
    DisconnectedBlock,
}

/// Reason a header was rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unknown,
    InvalidPospace,
    InvalidPrevBlockHash,
    InvalidHeight,
    InvalidWeight,
    InvalidTotalIters,
    InvalidRequiredIters,
    InvalidNewSubSlotIters,
    InvalidNewDifficulty,
    InvalidCcEosVdf,
    InvalidRcEosVdf,
    InvalidSubEpochSummary,
    TimestampTooFarInPast,
    TimestampTooFarInFuture,
    InvalidTransactionsFilterHash,
}
