//! Root-declaration ingestion and descriptor publishing for the World
//! generation tool.

mod directory;
mod publish;

pub use directory::{build_roots, parse_declaration_document, RootDeclaration};
pub use publish::{default_world_source, publish_world, PublishError};
