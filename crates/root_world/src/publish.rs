//! Final validation and artifact output.
//!
//! A descriptor is written only after the freshly encoded bytes survive a
//! decode-and-compare pass, so a codec bug aborts the build instead of
//! publishing a corrupt World.

use std::fmt;
use std::fs;
use std::path::Path;

use root_world_proto::{encode_world, validate_round_trip, SerializationError, World};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    Serialization(SerializationError),
    Io(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Serialization(err) => write!(f, "{}", err),
            PublishError::Io(reason) => write!(f, "io error: {}", reason),
        }
    }
}

impl std::error::Error for PublishError {}

impl From<SerializationError> for PublishError {
    fn from(error: SerializationError) -> Self {
        PublishError::Serialization(error)
    }
}

/// Encodes, round-trip validates, and writes the signed World. Returns the
/// number of bytes written.
pub fn publish_world(world: &World, path: &Path) -> Result<usize, PublishError> {
    validate_round_trip(world)?;
    let bytes = encode_world(world)?;
    fs::write(path, &bytes)
        .map_err(|err| PublishError::Io(format!("write {}: {}", path.display(), err)))?;
    Ok(bytes.len())
}

/// Renders the encoded World as a Rust constant suitable for embedding as
/// a compiled-in default.
pub fn default_world_source(name: &str, bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5 + 64);
    out.push_str(&format!("pub const {}: [u8; {}] = [\n    ", name, bytes.len()));
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            if index % 12 == 0 {
                out.push_str(",\n    ");
            } else {
                out.push_str(", ");
            }
        }
        out.push_str(&format!("{:#04x}", byte));
    }
    out.push_str(",\n];\n");
    out
}
