use crate::error::{BlockchainError, Result};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Length in bytes of the bincode encoding, used for the block size field
pub fn encoded_size<T: bincode::Encode>(data: &T) -> Result<u64> {
    Ok(serialize(data)?.len() as u64)
}
