//! Canonical binary encoding of a World.
//!
//! Field order is fixed (kind, id, timestamp, current public key, roots,
//! signature), all integers are big-endian, and every variable-length field
//! carries an explicit byte count. Encoding the same logical World twice
//! yields byte-identical output; the decoder rejects anything the encoder
//! would not produce.

use crate::error::SerializationError;
use crate::world::{Endpoint, EndpointProtocol, Identity, Root, World, WorldKind, IDENTITY_KEY_LEN};

/// Upper bound on a serialized World. Decoding longer input fails before
/// any length-prefixed allocation.
pub const WORLD_MAX_SERIALIZED_LEN: usize = 16 * 1024;

/// Encodes the byte range covered by the signature: every field except the
/// trailing signature itself.
pub fn signable_prefix(world: &World) -> Result<Vec<u8>, SerializationError> {
    let mut out = Vec::with_capacity(256);
    out.push(world.kind.wire_tag());
    out.extend_from_slice(&world.id.to_be_bytes());
    out.extend_from_slice(&world.timestamp.to_be_bytes());
    write_bytes(&mut out, &world.current_public_key)?;
    write_u16_count(&mut out, world.roots.len(), "root count")?;
    for root in &world.roots {
        write_bytes(&mut out, root.identity.public_key())?;
        write_u16_count(&mut out, root.stable_endpoints.len(), "endpoint count")?;
        for endpoint in &root.stable_endpoints {
            out.push(endpoint.protocol.wire_tag());
            write_bytes(&mut out, endpoint.host.as_bytes())?;
            out.extend_from_slice(&endpoint.port.to_be_bytes());
        }
    }
    if out.len() > WORLD_MAX_SERIALIZED_LEN {
        return Err(SerializationError::TooLarge {
            len: out.len(),
            max: WORLD_MAX_SERIALIZED_LEN,
        });
    }
    Ok(out)
}

/// Encodes the full World: signable prefix plus the signature field.
pub fn encode_world(world: &World) -> Result<Vec<u8>, SerializationError> {
    let mut out = signable_prefix(world)?;
    write_bytes(&mut out, &world.signature)?;
    if out.len() > WORLD_MAX_SERIALIZED_LEN {
        return Err(SerializationError::TooLarge {
            len: out.len(),
            max: WORLD_MAX_SERIALIZED_LEN,
        });
    }
    Ok(out)
}

/// Decodes a canonical World encoding. Truncated input, out-of-range
/// declared lengths, unknown tags, and trailing bytes are all rejected.
pub fn decode_world(bytes: &[u8]) -> Result<World, SerializationError> {
    if bytes.len() > WORLD_MAX_SERIALIZED_LEN {
        return Err(SerializationError::TooLarge {
            len: bytes.len(),
            max: WORLD_MAX_SERIALIZED_LEN,
        });
    }
    let mut cursor = Cursor::new(bytes);

    let kind_tag = cursor.read_u8("kind tag")?;
    let kind = WorldKind::from_wire_tag(kind_tag)
        .ok_or_else(|| SerializationError::malformed(format!("unknown kind tag {kind_tag:#04x}")))?;
    let id = cursor.read_u64("world id")?;
    let timestamp = cursor.read_u64("timestamp")?;

    let key_bytes = cursor.read_length_prefixed("current public key")?;
    let current_public_key: [u8; IDENTITY_KEY_LEN] = key_bytes
        .try_into()
        .map_err(|_| SerializationError::malformed("current public key must be 32 bytes"))?;

    let root_count = cursor.read_u16("root count")?;
    let mut roots = Vec::with_capacity(root_count as usize);
    for _ in 0..root_count {
        roots.push(read_root(&mut cursor)?);
    }

    let signature = cursor.read_length_prefixed("signature")?.to_vec();
    if !cursor.is_empty() {
        return Err(SerializationError::malformed(
            "trailing bytes after signature field",
        ));
    }

    Ok(World {
        kind,
        id,
        timestamp,
        current_public_key,
        roots,
        signature,
    })
}

/// Encode-decode-compare guard run before any World is published. A
/// mismatch indicates a codec bug and must abort the build.
pub fn validate_round_trip(world: &World) -> Result<(), SerializationError> {
    let bytes = encode_world(world)?;
    let decoded = decode_world(&bytes)?;
    if decoded != *world {
        return Err(SerializationError::RoundTripMismatch);
    }
    Ok(())
}

fn read_root(cursor: &mut Cursor<'_>) -> Result<Root, SerializationError> {
    let key_bytes = cursor.read_length_prefixed("root identity key")?;
    let public_key: [u8; IDENTITY_KEY_LEN] = key_bytes
        .try_into()
        .map_err(|_| SerializationError::malformed("root identity key must be 32 bytes"))?;
    let identity = Identity::new(public_key);

    let endpoint_count = cursor.read_u16("endpoint count")?;
    let mut stable_endpoints = Vec::with_capacity(endpoint_count as usize);
    for _ in 0..endpoint_count {
        let protocol_tag = cursor.read_u8("endpoint protocol tag")?;
        let protocol = EndpointProtocol::from_wire_tag(protocol_tag).ok_or_else(|| {
            SerializationError::malformed(format!("unknown endpoint protocol tag {protocol_tag}"))
        })?;
        let host_bytes = cursor.read_length_prefixed("endpoint host")?;
        let host = std::str::from_utf8(host_bytes)
            .map_err(|_| SerializationError::malformed("endpoint host is not valid utf-8"))?
            .to_string();
        let port = cursor.read_u16("endpoint port")?;
        stable_endpoints.push(Endpoint {
            protocol,
            host,
            port,
        });
    }

    Ok(Root {
        identity,
        stable_endpoints,
    })
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), SerializationError> {
    let len = u16::try_from(bytes.len()).map_err(|_| SerializationError::TooLarge {
        len: bytes.len(),
        max: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn write_u16_count(out: &mut Vec<u8>, count: usize, field: &str) -> Result<(), SerializationError> {
    let count = u16::try_from(count)
        .map_err(|_| SerializationError::malformed(format!("{field} exceeds u16 range")))?;
    out.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

/// Bounds-checked reader over the input buffer. Every read names the field
/// it was after so truncation errors point at the failing stage.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], SerializationError> {
        let remaining = self.bytes.len() - self.pos;
        if len > remaining {
            return Err(SerializationError::malformed(format!(
                "truncated input reading {field}: need {len} bytes, {remaining} remain"
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self, field: &str) -> Result<u8, SerializationError> {
        Ok(self.take(1, field)?[0])
    }

    fn read_u16(&mut self, field: &str) -> Result<u16, SerializationError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u64(&mut self, field: &str) -> Result<u64, SerializationError> {
        let bytes = self.take(8, field)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    fn read_length_prefixed(&mut self, field: &str) -> Result<&'a [u8], SerializationError> {
        let len = self.read_u16(field)? as usize;
        self.take(len, field)
    }
}
