//! One-shot generator for the signed root-directory descriptor.
//!
//! Reads root-declaration JSON documents, loads (or bootstraps) the
//! previous/current key generations, assembles and signs a World, and
//! writes the canonical binary artifact plus a literal-array dump for
//! embedding as a compiled-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use root_world::{build_roots, default_world_source, publish_world, RootDeclaration};
use root_world_keys::KeyContinuityStore;
use root_world_proto::{decode_world, sign_world, verify_world, World, WorldKind};

/// Well-known lineage id of the default planet descriptor.
const DEFAULT_WORLD_ID: u64 = 149_604_618;
const DEFAULT_PREVIOUS_KEY_PATH: &str = "previous.key";
const DEFAULT_CURRENT_KEY_PATH: &str = "current.key";
const DEFAULT_OUTPUT_PATH: &str = "world.bin";

const EXIT_FATAL: i32 = 1;
const EXIT_MALFORMED_DECLARATIONS: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    kind: WorldKind,
    id: u64,
    previous_key_path: PathBuf,
    current_key_path: PathBuf,
    output_path: PathBuf,
    declaration_paths: Vec<PathBuf>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            kind: WorldKind::Planet,
            id: DEFAULT_WORLD_ID,
            previous_key_path: PathBuf::from(DEFAULT_PREVIOUS_KEY_PATH),
            current_key_path: PathBuf::from(DEFAULT_CURRENT_KEY_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            declaration_paths: Vec::new(),
        }
    }
}

#[derive(Debug)]
enum RunError {
    Fatal(String),
    Declarations(String),
}

impl RunError {
    fn exit_code(&self) -> i32 {
        match self {
            RunError::Fatal(_) => EXIT_FATAL,
            RunError::Declarations(_) => EXIT_MALFORMED_DECLARATIONS,
        }
    }

    fn message(&self) -> &str {
        match self {
            RunError::Fatal(message) | RunError::Declarations(message) => message,
        }
    }
}

fn main() {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    if raw_args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }

    let options = match parse_options(raw_args.iter().map(|arg| arg.as_str())) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            print_help();
            process::exit(EXIT_FATAL);
        }
    };

    if let Err(err) = run_mkworld(options) {
        eprintln!("mkworld failed: {}", err.message());
        process::exit(err.exit_code());
    }
}

fn parse_options<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg {
            "--planet" => options.kind = WorldKind::Planet,
            "--moon" => options.kind = WorldKind::Moon,
            "--id" => {
                let value = args.next().ok_or("--id requires a value")?;
                options.id = value
                    .parse()
                    .map_err(|_| format!("--id must be a u64, got {value:?}"))?;
            }
            "--previous-key" => {
                let value = args.next().ok_or("--previous-key requires a path")?;
                options.previous_key_path = PathBuf::from(value);
            }
            "--current-key" => {
                let value = args.next().ok_or("--current-key requires a path")?;
                options.current_key_path = PathBuf::from(value);
            }
            "--output" => {
                let value = args.next().ok_or("--output requires a path")?;
                options.output_path = PathBuf::from(value);
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {other}"));
            }
            declaration => options.declaration_paths.push(PathBuf::from(declaration)),
        }
    }

    if options.declaration_paths.is_empty() {
        return Err("at least one root-declaration JSON path is required".to_string());
    }
    Ok(options)
}

fn run_mkworld(options: CliOptions) -> Result<(), RunError> {
    let store = KeyContinuityStore::new(
        options.previous_key_path.clone(),
        options.current_key_path.clone(),
    );
    let chain = store
        .load()
        .map_err(|err| RunError::Fatal(err.to_string()))?;
    if chain.is_bootstrap() {
        eprintln!(
            "INFO: created initial world keys: {} and {} (both initially the same)",
            options.previous_key_path.display(),
            options.current_key_path.display()
        );
    }

    let declarations = load_declarations(&options.declaration_paths)?;
    let roots = build_roots(&declarations).map_err(|err| RunError::Declarations(err.to_string()))?;
    for root in &roots {
        for endpoint in &root.stable_endpoints {
            eprintln!("INFO: root {} at endpoint {}", root.identity.address(), endpoint);
        }
    }

    let timestamp = next_timestamp(&options);
    eprintln!(
        "INFO: generating and signing {} id={} ts={}",
        options.kind, options.id, timestamp
    );

    let world = World::assemble(
        options.kind,
        options.id,
        timestamp,
        chain.current().public_key_bytes(),
        roots,
    );
    let signed = sign_world(&world, &chain.previous().signing_key())
        .map_err(|err| RunError::Fatal(err.to_string()))?;
    if !verify_world(&signed, &chain.previous().public_key()) {
        return Err(RunError::Fatal(
            "signature does not verify against the previous generation key".to_string(),
        ));
    }

    let written = publish_world(&signed, &options.output_path)
        .map_err(|err| RunError::Fatal(err.to_string()))?;
    eprintln!(
        "INFO: {} written with {} bytes of binary world data",
        options.output_path.display(),
        written
    );

    let bytes = fs::read(&options.output_path)
        .map_err(|err| RunError::Fatal(format!("read back {}: {}", options.output_path.display(), err)))?;
    println!("{}", default_world_source("DEFAULT_WORLD", &bytes));
    Ok(())
}

fn load_declarations(paths: &[PathBuf]) -> Result<Vec<RootDeclaration>, RunError> {
    let mut declarations = Vec::new();
    for path in paths {
        let json = fs::read_to_string(path)
            .map_err(|err| RunError::Fatal(format!("read {}: {}", path.display(), err)))?;
        let parsed = root_world::parse_declaration_document(&json).map_err(|err| {
            RunError::Declarations(format!("{}: {}", path.display(), err))
        })?;
        declarations.extend(parsed);
    }
    Ok(declarations)
}

/// Current UNIX milliseconds, bumped past the previous artifact's
/// timestamp when regenerating the same `(kind, id)` lineage so consumers
/// can reject stale descriptors.
fn next_timestamp(options: &CliOptions) -> u64 {
    let now = now_ms();
    match previous_lineage_timestamp(&options.output_path, options.kind, options.id) {
        Some(old) => now.max(old + 1),
        None => now,
    }
}

fn previous_lineage_timestamp(path: &Path, kind: WorldKind, id: u64) -> Option<u64> {
    let bytes = fs::read(path).ok()?;
    let world = decode_world(&bytes).ok()?;
    (world.kind == kind && world.id == id).then_some(world.timestamp)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

fn print_help() {
    println!("Usage: mkworld [options] <roots.json> [<roots.json> ...]");
    println!();
    println!("Options:");
    println!("  --planet                 build a planet descriptor (default)");
    println!("  --moon                   build a moon descriptor");
    println!("  --id <u64>               lineage id (default {DEFAULT_WORLD_ID})");
    println!("  --previous-key <path>    signing generation key file (default {DEFAULT_PREVIOUS_KEY_PATH})");
    println!("  --current-key <path>     embedded generation key file (default {DEFAULT_CURRENT_KEY_PATH})");
    println!("  --output <path>          binary artifact path (default {DEFAULT_OUTPUT_PATH})");
    println!("  -h, --help               show this help");
    println!();
    println!("If neither key file exists, a single pair is generated and used for");
    println!("both generations (self-signed genesis). Exit codes: 0 success,");
    println!("1 fatal configuration or verification failure, 2 malformed");
    println!("root-declaration input.");
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
        let dir = std::env::temp_dir().join(format!("mkworld-{prefix}-{unique}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn write_declarations(dir: &Path, name: &str, seed: u8, endpoint: &str) -> PathBuf {
        let path = dir.join(name);
        let json = format!(
            r#"{{"roots": [{{"identity": "{}", "stableEndpoints": ["{}"]}}]}}"#,
            hex::encode([seed; 32]),
            endpoint
        );
        fs::write(&path, json).expect("write declarations");
        path
    }

    fn options_for(dir: &Path, declaration_paths: Vec<PathBuf>) -> CliOptions {
        CliOptions {
            previous_key_path: dir.join("previous.key"),
            current_key_path: dir.join("current.key"),
            output_path: dir.join("world.bin"),
            declaration_paths,
            ..CliOptions::default()
        }
    }

    #[test]
    fn parse_options_defaults_and_overrides() {
        let options =
            parse_options(["--moon", "--id", "7", "--output", "out.bin", "roots.json"].into_iter())
                .expect("parse");
        assert_eq!(options.kind, WorldKind::Moon);
        assert_eq!(options.id, 7);
        assert_eq!(options.output_path, PathBuf::from("out.bin"));
        assert_eq!(options.declaration_paths, vec![PathBuf::from("roots.json")]);

        let defaults = parse_options(["roots.json"].into_iter()).expect("parse defaults");
        assert_eq!(defaults.kind, WorldKind::Planet);
        assert_eq!(defaults.id, DEFAULT_WORLD_ID);
    }

    #[test]
    fn parse_options_rejects_missing_declarations_and_unknown_flags() {
        assert!(parse_options(std::iter::empty()).is_err());
        assert!(parse_options(["--bogus", "roots.json"].into_iter()).is_err());
        assert!(parse_options(["--id", "notanumber", "roots.json"].into_iter()).is_err());
    }

    #[test]
    fn genesis_run_produces_self_verifying_artifact() {
        let dir = temp_dir("genesis");
        let declarations = write_declarations(&dir, "roots.json", 1, "203.0.113.1/9993");
        let options = options_for(&dir, vec![declarations]);

        run_mkworld(options.clone()).expect("run");

        let bytes = fs::read(&options.output_path).expect("read artifact");
        let world = decode_world(&bytes).expect("decode artifact");
        assert_eq!(world.kind, WorldKind::Planet);
        assert_eq!(world.id, DEFAULT_WORLD_ID);
        assert_eq!(world.roots.len(), 1);

        // Genesis is self-signed: the embedded current key is also the
        // signer's public key.
        let chain = KeyContinuityStore::new(&options.previous_key_path, &options.current_key_path)
            .load()
            .expect("reload keys");
        assert_eq!(world.current_public_key, chain.current().public_key_bytes());
        assert!(verify_world(&world, &chain.previous().public_key()));
    }

    #[test]
    fn regeneration_keeps_lineage_timestamp_strictly_increasing() {
        let dir = temp_dir("monotonic");
        let declarations = write_declarations(&dir, "roots.json", 1, "203.0.113.1/9993");
        let options = options_for(&dir, vec![declarations]);

        run_mkworld(options.clone()).expect("first run");
        let first = decode_world(&fs::read(&options.output_path).expect("read first"))
            .expect("decode first");

        run_mkworld(options.clone()).expect("second run");
        let second = decode_world(&fs::read(&options.output_path).expect("read second"))
            .expect("decode second");

        assert!(second.timestamp > first.timestamp);
        assert_eq!(second.kind, first.kind);
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn declaration_sources_concatenate_in_argument_order() {
        let dir = temp_dir("order");
        let first = write_declarations(&dir, "a.json", 1, "203.0.113.1/9993");
        let second = write_declarations(&dir, "b.json", 2, "203.0.113.2/9993");
        let options = options_for(&dir, vec![first, second]);

        run_mkworld(options.clone()).expect("run");
        let world = decode_world(&fs::read(&options.output_path).expect("read artifact"))
            .expect("decode artifact");
        assert_eq!(world.roots.len(), 2);
        assert_eq!(world.roots[0].identity.public_key(), &[1u8; 32]);
        assert_eq!(world.roots[1].identity.public_key(), &[2u8; 32]);
    }

    #[test]
    fn malformed_declarations_exit_without_artifact() {
        let dir = temp_dir("malformed");
        let path = dir.join("roots.json");
        fs::write(&path, r#"{"roots": "not-a-list"}"#).expect("write bad declarations");
        let options = options_for(&dir, vec![path]);

        let err = run_mkworld(options.clone()).expect_err("must fail");
        assert_eq!(err.exit_code(), EXIT_MALFORMED_DECLARATIONS);
        assert!(!options.output_path.exists());
    }

    #[test]
    fn invalid_key_material_is_fatal() {
        let dir = temp_dir("bad-keys");
        fs::write(dir.join("previous.key"), [0u8; 10]).expect("write bad key");
        fs::write(dir.join("current.key"), [0u8; 10]).expect("write bad key");
        let declarations = write_declarations(&dir, "roots.json", 1, "203.0.113.1/9993");
        let options = options_for(&dir, vec![declarations]);

        let err = run_mkworld(options.clone()).expect_err("must fail");
        assert_eq!(err.exit_code(), EXIT_FATAL);
        assert!(!options.output_path.exists());
    }
}
