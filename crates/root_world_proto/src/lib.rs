//! Root-directory descriptor ("World") data model, canonical wire encoding,
//! and trust-continuity signature scheme.

mod codec;
mod error;
mod signature;
mod world;

pub use codec::{
    decode_world, encode_world, signable_prefix, validate_round_trip, WORLD_MAX_SERIALIZED_LEN,
};
pub use error::{ConfigError, SerializationError};
pub use signature::{sign_world, verify_world, WORLD_SIGNATURE_LEN};
pub use world::{Endpoint, EndpointProtocol, Identity, Root, World, WorldKind, IDENTITY_KEY_LEN};
