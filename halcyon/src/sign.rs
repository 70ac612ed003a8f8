//! Signing contract.
//!
//! Key management lives outside this crate. Operation builders consume a
//! [`Signer`] to authorize the request bodies they encode; the transport
//! core itself never signs anything.

/// Produces and checks signatures over encoded request bytes.
pub trait Signer: Send + Sync {
    /// Sign `message`, returning the signature bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// Check `signature` against `message`.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}
