use crate::error::Result;

/// Holder of the local identity's private key.
///
/// The ledger calls this only when building a spend on the local identity's
/// behalf; private material never leaves the implementation.
pub trait KeyStore: Send + Sync {
    /// Uncompressed SEC1 public key (65 bytes)
    fn public_key(&self) -> Vec<u8>;

    /// DER-encoded ECDSA signature over a 32-byte digest
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>>;

    /// Lowercase hex of hash160 of the public key
    fn locking_key_for_self(&self) -> String;
}
