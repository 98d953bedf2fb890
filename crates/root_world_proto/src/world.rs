//! Value types for the signed root-directory descriptor.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Length of a root identity public key on the wire.
pub const IDENTITY_KEY_LEN: usize = 32;

/// Bytes of the blake3 digest kept as the short node fingerprint.
const FINGERPRINT_LEN: usize = 5;

/// Descriptor flavor. `Planet` is the singular well-known directory;
/// `Moon` descriptors are user-defined satellites of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldKind {
    Planet,
    Moon,
}

impl WorldKind {
    pub fn wire_tag(self) -> u8 {
        match self {
            WorldKind::Planet => 0x01,
            WorldKind::Moon => 0x7f,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(WorldKind::Planet),
            0x7f => Some(WorldKind::Moon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorldKind::Planet => "planet",
            WorldKind::Moon => "moon",
        }
    }
}

impl fmt::Display for WorldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A root server identity: an opaque public key plus a derived short
/// fingerprint used as the node id. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    public_key: [u8; IDENTITY_KEY_LEN],
}

impl Identity {
    pub fn new(public_key: [u8; IDENTITY_KEY_LEN]) -> Self {
        Self { public_key }
    }

    pub fn public_key(&self) -> &[u8; IDENTITY_KEY_LEN] {
        &self.public_key
    }

    pub fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        let digest = blake3::hash(&self.public_key);
        let mut fingerprint = [0u8; FINGERPRINT_LEN];
        fingerprint.copy_from_slice(&digest.as_bytes()[..FINGERPRINT_LEN]);
        fingerprint
    }

    /// Short node id: the fingerprint as 10 lowercase hex characters.
    pub fn address(&self) -> String {
        hex::encode(self.fingerprint())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address(), hex::encode(self.public_key))
    }
}

impl FromStr for Identity {
    type Err = ConfigError;

    /// Accepts `"<64-hex public key>"` or `"<10-hex address>:<64-hex public
    /// key>"`. A supplied address must match the one derived from the key.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ConfigError::MalformedIdentity {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let (claimed_address, key_hex) = match input.split_once(':') {
            Some((address, key)) => (Some(address), key),
            None => (None, input),
        };

        let key_bytes = hex::decode(key_hex).map_err(|_| malformed("public key is not hex"))?;
        let public_key: [u8; IDENTITY_KEY_LEN] = key_bytes
            .try_into()
            .map_err(|_| malformed("public key must be 32-byte hex"))?;
        let identity = Identity::new(public_key);

        if let Some(address) = claimed_address {
            if address != identity.address() {
                return Err(malformed("address does not match public key fingerprint"));
            }
        }
        Ok(identity)
    }
}

/// Transport tag carried with each endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointProtocol {
    Udp,
    Tcp,
}

impl EndpointProtocol {
    pub fn wire_tag(self) -> u8 {
        match self {
            EndpointProtocol::Udp => 0,
            EndpointProtocol::Tcp => 1,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EndpointProtocol::Udp),
            1 => Some(EndpointProtocol::Tcp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointProtocol::Udp => "udp",
            EndpointProtocol::Tcp => "tcp",
        }
    }
}

/// A transport-agnostic reachable address for a root server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub protocol: EndpointProtocol,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.protocol.as_str(), self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    /// Accepts `"host/port"` (udp assumed) or `"proto/host/port"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| ConfigError::MalformedEndpoint {
            value: input.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = input.split('/').collect();
        let (protocol, host, port_text) = match parts.as_slice() {
            [host, port] => (EndpointProtocol::Udp, *host, *port),
            [proto, host, port] => {
                let protocol = match *proto {
                    "udp" => EndpointProtocol::Udp,
                    "tcp" => EndpointProtocol::Tcp,
                    _ => return Err(malformed("unknown protocol tag")),
                };
                (protocol, *host, *port)
            }
            _ => return Err(malformed("expected host/port or proto/host/port")),
        };

        if host.is_empty() {
            return Err(malformed("host cannot be empty"));
        }
        let port: u16 = port_text
            .parse()
            .map_err(|_| malformed("port must be an integer in 0..=65535"))?;
        Ok(Endpoint {
            protocol,
            host: host.to_string(),
            port,
        })
    }
}

/// One root server record inside a World: identity plus its stable
/// endpoints. Endpoint order is preserved for deterministic encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub identity: Identity,
    pub stable_endpoints: Vec<Endpoint>,
}

/// The signed root-directory descriptor distributed to clients.
///
/// `(kind, id)` identify the lineage and never change across
/// re-generation. The signature covers every field except itself and
/// verifies against the *previous* key generation's public key, not the
/// embedded `current_public_key` (which belongs to the next generation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    pub kind: WorldKind,
    pub id: u64,
    pub timestamp: u64,
    pub current_public_key: [u8; IDENTITY_KEY_LEN],
    pub roots: Vec<Root>,
    pub signature: Vec<u8>,
}

impl World {
    /// Assembles an unsigned World. The signature is attached by
    /// `sign_world` before the descriptor may be published.
    pub fn assemble(
        kind: WorldKind,
        id: u64,
        timestamp: u64,
        current_public_key: [u8; IDENTITY_KEY_LEN],
        roots: Vec<Root>,
    ) -> Self {
        Self {
            kind,
            id,
            timestamp,
            current_public_key,
            roots,
            signature: Vec::new(),
        }
    }
}
