use alloy_primitives::B256;
use thiserror::Error;

use crate::types::ErrorCode;

/// An error from an operation on an `ObjectStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to (de)serialize stored object: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("an error from the underlying store: {0}")]
    Backend(String),
}

/// Rejection reported by the header validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("header validation failed with {code}: {message}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ErrorCode> for ValidationError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, String::new())
    }
}

/// Errors that can occur while tracking the canonical chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("disconnected block {0}: parent is unknown")]
    DisconnectedBlock(B256),

    #[error("invalid block {hash}: {code}")]
    InvalidBlock { hash: B256, code: ErrorCode },

    #[error("invalid weight proof: {0}")]
    InvalidWeightProof(String),

    /// The ancestor walk left the block record cache before finding a common ancestor.
    #[error("fork point not found: ancestor {missing} at height {height} is not cached")]
    ForkNotFound { missing: B256, height: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("block record not found: {0}")]
    BlockNotFound(B256),

    #[error("height {0} is not on the canonical chain")]
    HeightNotFound(u32),

    #[error("no iterations between the given blocks")]
    EmptyIterationRange,

    #[error("network space estimate does not fit in 128 bits")]
    NetworkSpaceOverflow,
}
