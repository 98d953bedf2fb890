//! Schema-validated ingestion of root-declaration documents.
//!
//! Each document is JSON of the form
//! `{"roots": [{"identity": "...", "stableEndpoints": ["...", ...]}]}`.
//! Unknown fields, missing fields, and wrong types are schema errors;
//! identity and endpoint strings are parsed into typed values afterwards.

use serde::Deserialize;

use root_world_proto::{ConfigError, Endpoint, Identity, Root};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarationDocument {
    roots: Vec<RootDeclaration>,
}

/// One declared root server, still in string form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootDeclaration {
    pub identity: String,
    #[serde(rename = "stableEndpoints")]
    pub stable_endpoints: Vec<String>,
}

/// Parses one declaration document into its root entries, in document
/// order.
pub fn parse_declaration_document(json: &str) -> Result<Vec<RootDeclaration>, ConfigError> {
    let document: DeclarationDocument =
        serde_json::from_str(json).map_err(|err| ConfigError::MalformedDeclaration {
            reason: err.to_string(),
        })?;
    Ok(document.roots)
}

/// Turns declarations into typed, validated roots. Declaration order is
/// preserved and duplicate identities are appended, not merged; rejecting
/// duplicates is a separate concern for callers that want it.
pub fn build_roots(declarations: &[RootDeclaration]) -> Result<Vec<Root>, ConfigError> {
    let mut roots = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        let identity: Identity = declaration.identity.parse()?;
        let mut stable_endpoints = Vec::with_capacity(declaration.stable_endpoints.len());
        for endpoint in &declaration.stable_endpoints {
            stable_endpoints.push(endpoint.parse::<Endpoint>()?);
        }
        roots.push(Root {
            identity,
            stable_endpoints,
        });
    }
    Ok(roots)
}
