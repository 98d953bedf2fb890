//! Key material anchoring trust across World generations.
//!
//! The store holds exactly two generations: `previous` signs the new
//! World, `current` is embedded in it and will sign the next one. On
//! first run a single generated pair serves as both (self-signed genesis).

use std::fs;
use std::path::{Path, PathBuf};

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::OsRng;

use root_world_proto::ConfigError;

/// Key-pair file format version byte.
pub const KEY_PAIR_FORMAT_VERSION: u8 = 0x01;

/// Encoded key-pair file length: version + public key + private key.
pub const KEY_PAIR_ENCODED_LEN: usize = 1 + 32 + 32;

/// One generation of the signing key chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    public: [u8; 32],
    private: [u8; 32],
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            public: signing_key.verifying_key().to_bytes(),
            private: signing_key.to_bytes(),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        // The public half is always derived from the private half.
        self.signing_key().verifying_key()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.private)
    }

    /// Versioned file encoding: version byte, public key, private key.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(KEY_PAIR_ENCODED_LEN);
        out.push(KEY_PAIR_FORMAT_VERSION);
        out.extend_from_slice(&self.public);
        out.extend_from_slice(&self.private);
        out
    }

    /// Decodes a versioned key-pair file. The stored public key must match
    /// the one derived from the private key; a flat legacy concatenation
    /// or unknown version byte is rejected rather than silently misread.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != KEY_PAIR_ENCODED_LEN {
            return Err(ConfigError::InvalidKeyMaterial {
                reason: format!(
                    "expected {} bytes, found {}",
                    KEY_PAIR_ENCODED_LEN,
                    bytes.len()
                ),
            });
        }
        if bytes[0] != KEY_PAIR_FORMAT_VERSION {
            return Err(ConfigError::InvalidKeyMaterial {
                reason: format!("unknown key pair format version {:#04x}", bytes[0]),
            });
        }
        let mut public = [0u8; 32];
        public.copy_from_slice(&bytes[1..33]);
        let mut private = [0u8; 32];
        private.copy_from_slice(&bytes[33..65]);

        let derived = SigningKey::from_bytes(&private).verifying_key().to_bytes();
        if derived != public {
            return Err(ConfigError::InvalidKeyMaterial {
                reason: "stored public key does not match private key".to_string(),
            });
        }
        Ok(Self { public, private })
    }
}

/// Append-only chain of key generations, oldest first. Today the chain is
/// at most two long, but nothing below depends on that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChain {
    generations: Vec<KeyPair>,
}

impl KeyChain {
    /// Single-generation bootstrap chain: previous == current.
    pub fn bootstrap(pair: KeyPair) -> Self {
        Self {
            generations: vec![pair],
        }
    }

    pub fn new(previous: KeyPair, current: KeyPair) -> Self {
        Self {
            generations: vec![previous, current],
        }
    }

    /// The generation whose private key signs the new World.
    pub fn previous(&self) -> &KeyPair {
        &self.generations[0]
    }

    /// The generation whose public key is embedded in the new World.
    pub fn current(&self) -> &KeyPair {
        &self.generations[self.generations.len() - 1]
    }

    pub fn is_bootstrap(&self) -> bool {
        self.generations.len() == 1
    }
}

/// Loads or bootstraps the previous/current key pair files. Paths are
/// explicit; the store never assumes a working directory.
#[derive(Debug, Clone)]
pub struct KeyContinuityStore {
    previous_path: PathBuf,
    current_path: PathBuf,
}

impl KeyContinuityStore {
    pub fn new(previous_path: impl Into<PathBuf>, current_path: impl Into<PathBuf>) -> Self {
        Self {
            previous_path: previous_path.into(),
            current_path: current_path.into(),
        }
    }

    /// Returns the chain anchoring this run.
    ///
    /// Both files absent: generates one pair, persists it to both paths,
    /// returns the bootstrap chain. Both present: decodes both. Exactly
    /// one present: strict-pairing failure, no recovery. Existing material
    /// is never overwritten.
    pub fn load(&self) -> Result<KeyChain, ConfigError> {
        let previous_exists = self.previous_path.exists();
        let current_exists = self.current_path.exists();

        match (previous_exists, current_exists) {
            (false, false) => {
                let pair = KeyPair::generate();
                let encoded = pair.encode();
                write_key_file(&self.previous_path, &encoded)?;
                write_key_file(&self.current_path, &encoded)?;
                Ok(KeyChain::bootstrap(pair))
            }
            (true, true) => {
                let previous = read_key_file(&self.previous_path)?;
                let current = read_key_file(&self.current_path)?;
                Ok(KeyChain::new(previous, current))
            }
            (true, false) | (false, true) => Err(ConfigError::InvalidKeyMaterial {
                reason: format!(
                    "key files must exist as a pair: {} {}, {} {}",
                    self.previous_path.display(),
                    if previous_exists { "present" } else { "missing" },
                    self.current_path.display(),
                    if current_exists { "present" } else { "missing" },
                ),
            }),
        }
    }
}

fn read_key_file(path: &Path) -> Result<KeyPair, ConfigError> {
    let bytes =
        fs::read(path).map_err(|err| ConfigError::Io(format!("read {}: {}", path.display(), err)))?;
    KeyPair::decode(&bytes).map_err(|err| match err {
        ConfigError::InvalidKeyMaterial { reason } => ConfigError::InvalidKeyMaterial {
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    })
}

fn write_key_file(path: &Path, bytes: &[u8]) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| ConfigError::Io(format!("create {}: {}", parent.display(), err)))?;
        }
    }
    fs::write(path, bytes)
        .map_err(|err| ConfigError::Io(format!("write {}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("duration since epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("root-world-keys-{prefix}-{unique}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn key_pair_encode_decode_round_trip() {
        let pair = KeyPair::generate();
        let decoded = KeyPair::decode(&pair.encode()).expect("decode");
        assert_eq!(decoded, pair);
    }

    #[test]
    fn decode_rejects_wrong_length_and_version() {
        assert!(matches!(
            KeyPair::decode(&[0u8; 64]),
            Err(ConfigError::InvalidKeyMaterial { .. })
        ));

        let mut encoded = KeyPair::generate().encode();
        encoded[0] = 0x02;
        assert!(matches!(
            KeyPair::decode(&encoded),
            Err(ConfigError::InvalidKeyMaterial { .. })
        ));
    }

    #[test]
    fn decode_rejects_mismatched_public_key() {
        let mut encoded = KeyPair::generate().encode();
        encoded[1] ^= 0xff;
        assert!(matches!(
            KeyPair::decode(&encoded),
            Err(ConfigError::InvalidKeyMaterial { .. })
        ));
    }

    #[test]
    fn bootstrap_creates_identical_pair_files() {
        let dir = temp_dir("bootstrap");
        let store = KeyContinuityStore::new(dir.join("previous.key"), dir.join("current.key"));

        let chain = store.load().expect("bootstrap load");
        assert!(chain.is_bootstrap());
        assert_eq!(chain.previous(), chain.current());
        assert_eq!(
            fs::read(dir.join("previous.key")).expect("read previous"),
            fs::read(dir.join("current.key")).expect("read current"),
        );
    }

    #[test]
    fn reload_returns_persisted_keys_without_regenerating() {
        let dir = temp_dir("reload");
        let store = KeyContinuityStore::new(dir.join("previous.key"), dir.join("current.key"));

        let first = store.load().expect("first load");
        let second = store.load().expect("second load");
        assert_eq!(first.previous(), second.previous());
        assert_eq!(first.current(), second.current());
        assert!(!second.is_bootstrap());
    }

    #[test]
    fn single_key_file_is_strict_pairing_failure() {
        let dir = temp_dir("strict-pairing");
        let store = KeyContinuityStore::new(dir.join("previous.key"), dir.join("current.key"));
        fs::write(dir.join("previous.key"), KeyPair::generate().encode())
            .expect("write previous only");

        let result = store.load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidKeyMaterial { .. })
        ));
    }

    #[test]
    fn truncated_key_file_is_invalid_material() {
        let dir = temp_dir("truncated");
        let store = KeyContinuityStore::new(dir.join("previous.key"), dir.join("current.key"));
        fs::write(dir.join("previous.key"), [0u8; 10]).expect("write truncated");
        fs::write(dir.join("current.key"), KeyPair::generate().encode()).expect("write current");

        let result = store.load();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidKeyMaterial { .. })
        ));
    }

    #[test]
    fn distinct_generations_load_as_two_long_chain() {
        let dir = temp_dir("two-generations");
        let previous = KeyPair::generate();
        let current = KeyPair::generate();
        fs::write(dir.join("previous.key"), previous.encode()).expect("write previous");
        fs::write(dir.join("current.key"), current.encode()).expect("write current");

        let store = KeyContinuityStore::new(dir.join("previous.key"), dir.join("current.key"));
        let chain = store.load().expect("load");
        assert_eq!(chain.previous(), &previous);
        assert_eq!(chain.current(), &current);
        assert!(!chain.is_bootstrap());
    }
}
