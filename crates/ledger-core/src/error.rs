use thiserror::Error;

/// Every failure the engine can surface. All of them are deterministic and
/// leave the ledger unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("unknown sender: {0}")]
    UnknownSender(String),

    #[error("invalid amount: {0} (must be finite and non-negative)")]
    InvalidAmount(f64),

    #[error("invalid difficulty: {difficulty} (must be between 1 and {max})")]
    InvalidDifficulty { difficulty: u32, max: u32 },

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("a client named {0:?} already exists")]
    DuplicateName(String),

    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("no pending transactions to mine")]
    EmptyPool,

    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("no nonce below {limit} satisfies difficulty {difficulty}")]
    NonceSpaceExhausted { limit: u64, difficulty: u32 },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
