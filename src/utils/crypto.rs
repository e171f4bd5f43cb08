use once_cell::sync::Lazy;
use ring::digest::{Context, SHA256};
use ripemd::{Digest as RipemdDigest, Ripemd160};
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Seconds since the Unix epoch
pub fn current_timestamp() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?;
    Ok(duration.as_secs())
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 applied twice
pub fn sha256d_digest(data: &[u8]) -> Vec<u8> {
    sha256_digest(sha256_digest(data).as_slice())
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// RIPEMD-160 over SHA-256, the owner hash used in locking keys
pub fn hash160(data: &[u8]) -> Vec<u8> {
    ripemd160_digest(sha256_digest(data).as_slice())
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BlockchainError::Structural(format!("Invalid base58 encoding: {e}")))
}

pub fn new_key_pair() -> (SecretKey, PublicKey) {
    SECP.generate_keypair(&mut rand::thread_rng())
}

pub fn public_key_of(secret: &SecretKey) -> PublicKey {
    PublicKey::from_secret_key(&SECP, secret)
}

#[allow(deprecated)]
fn message_from_digest(digest: &[u8]) -> Result<Message> {
    Message::from_slice(digest)
        .map_err(|e| BlockchainError::Crypto(format!("Digest must be 32 bytes: {e}")))
}

/// Signs a 32-byte digest, returning the DER-encoded signature
pub fn ecdsa_secp256k1_sign_digest(secret: &SecretKey, digest: &[u8]) -> Result<Vec<u8>> {
    let message = message_from_digest(digest)?;
    let signature = SECP.sign_ecdsa(&message, secret);
    Ok(signature.serialize_der().to_vec())
}

pub fn ecdsa_secp256k1_verify(public_key: &[u8], signature: &[u8], digest: &[u8]) -> bool {
    let Ok(message) = message_from_digest(digest) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(signature) else {
        return false;
    };
    let Ok(public_key) = PublicKey::from_slice(public_key) else {
        return false;
    };
    SECP.verify_ecdsa(&message, &signature, &public_key).is_ok()
}

pub fn hex_encode(data: &[u8]) -> String {
    HEXLOWER.encode(data)
}

pub fn hex_decode(data: &str) -> Result<Vec<u8>> {
    Ok(HEXLOWER.decode(data.as_bytes())?)
}
