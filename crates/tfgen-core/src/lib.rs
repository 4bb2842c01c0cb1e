pub mod config;
pub mod diagnostics;
pub mod error;
pub mod explorer;
pub mod generate;
pub mod ir;
pub mod mapper;
pub mod merge;
pub mod naming;
pub mod parse;

pub use config::{Config, EntityId, EntityKind, load_config};
pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::{ConfigError, EntityError, GenerateError, ParseError};
pub use generate::{ErrorPolicy, Report, generate, to_json};
pub use parse::DocumentModel;

use std::path::Path;

/// Parse an OpenAPI document, choosing JSON for `.json` paths and YAML otherwise.
pub fn load_document(path: &Path, content: &str) -> Result<DocumentModel, ParseError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let spec = if is_json {
        parse::from_json(content)?
    } else {
        parse::from_yaml(content)?
    };
    Ok(DocumentModel::new(spec))
}
