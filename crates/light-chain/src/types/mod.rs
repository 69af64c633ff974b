mod block_record;
mod header_block;
mod receive;
mod weight_proof;

pub use block_record::BlockRecord;
pub use header_block::{
    ChallengeChainSubSlot, EndOfSubSlotBundle, Foliage, FoliageTransactionBlock, HeaderBlock,
    RewardChainBlock,
};
pub use receive::{ErrorCode, ReceiveBlockResult};
pub use weight_proof::{SubEpochData, SubEpochSummary, WeightProof};
