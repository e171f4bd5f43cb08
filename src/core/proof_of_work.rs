use crate::core::block::{Block, BlockHeader, BlockTemplate};
use crate::core::hashing::header_digest;
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use num_bigint::BigUint;

/// First nonce tried by every search
pub const NONCE_BASE: u64 = 0x1000_0000;

/// Expands compact bits (exponent byte, 3-byte coefficient) into the full target
pub fn target_from_bits(bits: u32) -> BigUint {
    let exponent = bits >> 24;
    let coefficient = BigUint::from(bits & 0x00ff_ffff);
    if exponent <= 3 {
        coefficient >> (8 * (3 - exponent) as usize)
    } else {
        coefficient << (8 * (exponent - 3) as usize)
    }
}

/// Compacts a target: exponent is its byte length, coefficient its leading three bytes
pub fn bits_from_target(target: &BigUint) -> u32 {
    let bytes = target.to_bytes_be();
    if bytes == [0] {
        return 0;
    }
    let exponent = bytes.len() as u32;
    let mut coefficient = 0u32;
    for i in 0..3 {
        coefficient = (coefficient << 8) | u32::from(bytes.get(i).copied().unwrap_or(0));
    }
    (exponent << 24) | coefficient
}

/// Expected number of hashes to meet `bits`: 2^256 / (target + 1)
pub fn work_from_bits(bits: u32) -> BigUint {
    let target = target_from_bits(bits);
    (BigUint::from(1u8) << 256usize) / (target + 1u8)
}

pub enum MiningOutcome {
    Found(Block),
    Cancelled,
}

pub struct ProofOfWork {
    template: BlockTemplate,
    target: BigUint,
}

impl ProofOfWork {
    pub fn new(template: BlockTemplate) -> ProofOfWork {
        let target = target_from_bits(template.get_bits());
        ProofOfWork { template, target }
    }

    pub fn get_target(&self) -> &BigUint {
        &self.target
    }

    pub fn meets_target(header: &BlockHeader, target: &BigUint) -> bool {
        BigUint::from_bytes_be(&header_digest(header)) <= *target
    }

    /// Rejects headers whose hash, read as a big-endian integer, exceeds the target
    pub fn check(header: &BlockHeader) -> Result<()> {
        let target = target_from_bits(header.get_bits());
        if !Self::meets_target(header, &target) {
            return Err(BlockchainError::InvalidProofOfWork(format!(
                "hash {} exceeds target for bits {:#010x}",
                header.hash(),
                header.get_bits()
            )));
        }
        Ok(())
    }

    /// Searches nonces upward from `NONCE_BASE` at the template timestamp until
    /// a header meets the target or `should_stop` returns true.
    pub fn run<F: Fn() -> bool>(self, should_stop: F) -> Result<MiningOutcome> {
        debug!(
            "Mining on {} with bits {:#010x}",
            self.template.get_previous_hash(),
            self.template.get_bits()
        );
        let mut nonce = NONCE_BASE;
        loop {
            if should_stop() {
                debug!("Mining on {} cancelled", self.template.get_previous_hash());
                return Ok(MiningOutcome::Cancelled);
            }
            let header = self.template.header(nonce);
            if Self::meets_target(&header, &self.target) {
                info!(
                    "Found block {} after {} attempts",
                    header.hash(),
                    nonce - NONCE_BASE + 1
                );
                return self.template.into_block(header).map(MiningOutcome::Found);
            }
            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| BlockchainError::Mining("nonce space exhausted".to_string()))?;
        }
    }
}
