use crate::error::{BlockchainError, Result};
use crate::utils::{
    base58_decode, base58_encode, ecdsa_secp256k1_sign_digest, hash160, hex_encode,
    new_key_pair, public_key_of, sha256d_digest,
};
use crate::wallet::KeyStore;
use secp256k1::SecretKey;
use std::fmt;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
const PUB_KEY_HASH_LEN: usize = 20;

#[derive(Clone)]
pub struct Wallet {
    secret: SecretKey,
    public_key: Vec<u8>,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish()
    }
}

impl Wallet {
    pub fn new() -> Wallet {
        let (secret, public_key) = new_key_pair();
        Wallet {
            secret,
            public_key: public_key.serialize_uncompressed().to_vec(),
        }
    }

    /// Restores a wallet from a raw 32-byte secret
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Wallet> {
        let secret = SecretKey::from_slice(bytes)?;
        let public_key = public_key_of(&secret).serialize_uncompressed().to_vec();
        Ok(Wallet { secret, public_key })
    }

    pub fn get_address(&self) -> String {
        convert_address(&hash_pub_key(&self.public_key))
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }
}

impl KeyStore for Wallet {
    fn public_key(&self) -> Vec<u8> {
        self.public_key.clone()
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        ecdsa_secp256k1_sign_digest(&self.secret, digest)
    }

    fn locking_key_for_self(&self) -> String {
        hex_encode(&hash_pub_key(&self.public_key))
    }
}

pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    hash160(pub_key)
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    sha256d_digest(payload)[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn validate_address(address: &str) -> bool {
    let payload = match base58_decode(address) {
        Ok(payload) => payload,
        Err(_) => return false,
    };
    if payload.len() != 1 + PUB_KEY_HASH_LEN + ADDRESS_CHECK_SUM_LEN || payload[0] != VERSION {
        return false;
    }
    let (body, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    checksum(body) == actual_checksum
}

/// version ‖ pub_key_hash ‖ checksum, base58 encoded
pub fn convert_address(pub_hash_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(pub_hash_key);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}

/// Locking key (hex pub key hash) carried by a valid address
pub fn locking_key_from_address(address: &str) -> Result<String> {
    if !validate_address(address) {
        return Err(BlockchainError::Structural(format!(
            "invalid address: {address}"
        )));
    }
    let payload = base58_decode(address)?;
    Ok(hex_encode(&payload[1..payload.len() - ADDRESS_CHECK_SUM_LEN]))
}
