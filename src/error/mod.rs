//! Error handling for the ledger
//!
//! Every validation entry point reports a typed `BlockchainError`. Rejections of
//! external input never mutate ledger state; callers log them and carry on.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error taxonomy for ledger operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// A transaction or block is missing fields or carries malformed ones
    Structural(String),
    /// An input references an output that is not in the UTXO snapshot
    UnresolvedInput { tx_hash: String, index: u32 },
    /// Two inputs in one candidate set consume the same output
    DoubleSpend { tx_hash: String, index: u32 },
    /// An input is already referenced by a pooled transaction
    ConflictingInput { tx_hash: String, index: u32 },
    /// Sum of outputs differs from sum of resolved inputs
    ValueMismatch { inputs: u64, outputs: u64 },
    /// Signature, public key or owner check failed
    InvalidSignature(String),
    /// The coinbase transaction breaks the coinbase rules
    InvalidCoinbase(String),
    /// Header hash does not satisfy the declared target
    InvalidProofOfWork(String),
    /// Header previous-hash does not match the predecessor
    InvalidPredecessorLink { expected: String, actual: String },
    /// A candidate chain does not start with the fixed genesis block
    InvalidGenesis,
    /// A block would create an output key that already exists
    DuplicateOutput { tx_hash: String, index: u32 },
    /// Spend construction cannot cover the requested amount
    InsufficientFunds { required: u64, available: u64 },
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// Mining errors
    Mining(String),
    /// A shared-state lock was poisoned by a panicking writer
    Lock(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Structural(msg) => write!(f, "Structural error: {msg}"),
            BlockchainError::UnresolvedInput { tx_hash, index } => {
                write!(f, "Unresolved input: {tx_hash}:{index}")
            }
            BlockchainError::DoubleSpend { tx_hash, index } => {
                write!(f, "Double spend of {tx_hash}:{index}")
            }
            BlockchainError::ConflictingInput { tx_hash, index } => {
                write!(f, "Input {tx_hash}:{index} already referenced in the pool")
            }
            BlockchainError::ValueMismatch { inputs, outputs } => {
                write!(f, "Value mismatch: inputs {inputs}, outputs {outputs}")
            }
            BlockchainError::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            BlockchainError::InvalidCoinbase(msg) => write!(f, "Invalid coinbase: {msg}"),
            BlockchainError::InvalidProofOfWork(msg) => write!(f, "Invalid proof of work: {msg}"),
            BlockchainError::InvalidPredecessorLink { expected, actual } => {
                write!(
                    f,
                    "Invalid predecessor link: expected {expected}, got {actual}"
                )
            }
            BlockchainError::InvalidGenesis => write!(f, "Chain does not start with genesis"),
            BlockchainError::DuplicateOutput { tx_hash, index } => {
                write!(f, "Duplicate output key {tx_hash}:{index}")
            }
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<secp256k1::Error> for BlockchainError {
    fn from(err: secp256k1::Error) -> Self {
        BlockchainError::Crypto(err.to_string())
    }
}

impl From<data_encoding::DecodeError> for BlockchainError {
    fn from(err: data_encoding::DecodeError) -> Self {
        BlockchainError::Structural(format!("invalid hex: {err}"))
    }
}
