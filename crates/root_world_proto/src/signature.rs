//! Trust-continuity signing of a World.
//!
//! A new World is always signed with the *previous* key generation's
//! private key; the embedded `current_public_key` belongs to the next
//! generation and is never the verification key for this World.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::codec::signable_prefix;
use crate::error::SerializationError;
use crate::world::World;

/// ed25519 signature length on the wire.
pub const WORLD_SIGNATURE_LEN: usize = 64;

/// Signs the world's signable prefix and returns the world with the
/// signature attached.
pub fn sign_world(world: &World, signer: &SigningKey) -> Result<World, SerializationError> {
    let prefix = signable_prefix(world)?;
    let signature: Signature = signer.sign(&prefix);
    let mut signed = world.clone();
    signed.signature = signature.to_bytes().to_vec();
    Ok(signed)
}

/// Recomputes the signable prefix and checks the embedded signature.
/// Malformed signature bytes or an unencodable world verify false.
pub fn verify_world(world: &World, signer_public: &VerifyingKey) -> bool {
    let prefix = match signable_prefix(world) {
        Ok(prefix) => prefix,
        Err(_) => return false,
    };
    let signature_bytes: [u8; WORLD_SIGNATURE_LEN] = match world.signature.as_slice().try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(&signature_bytes);
    signer_public.verify(&prefix, &signature).is_ok()
}
