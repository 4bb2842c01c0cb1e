use std::path::PathBuf;

use thiserror::Error;

use crate::config::{EntityId, EntityKind};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolved reference: {0}")]
    UnresolvedRef(String),

    #[error("circular reference detected: {0}")]
    CircularRef(String),

    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference target not found: {0}")]
    RefTargetNotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("{kind} '{entity}' declares no operations")]
    NoOperations { kind: EntityKind, entity: String },

    #[error("data source '{entity}' must declare a read operation")]
    MissingRead { entity: String },

    #[error("{kind} '{entity}' has an invalid {verb} locator: {reason}")]
    InvalidLocator {
        kind: EntityKind,
        entity: String,
        verb: String,
        reason: String,
    },

    #[error("{kind} name '{entity}' is not a valid Terraform identifier")]
    InvalidName { kind: EntityKind, entity: String },

    #[error("provider name must not be empty")]
    MissingProviderName,

    #[error("{entity}: override rule #{index} has an empty path")]
    EmptyRulePath { entity: EntityId, index: usize },
}

/// A fatal error scoped to one entity. Other entities keep generating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    #[error("{entity}: operation {locator} could not be resolved: {reason}")]
    ConfigResolution {
        entity: EntityId,
        locator: String,
        reason: String,
    },

    #[error("{entity}: operation {locator} is ambiguous, matches {}", .candidates.join(", "))]
    AmbiguousReference {
        entity: EntityId,
        locator: String,
        candidates: Vec<String>,
    },

    #[error("{entity}: type conflict at '{field_path}': {}", .conflicting_types.join(" vs "))]
    TypeConflict {
        entity: EntityId,
        field_path: String,
        conflicting_types: Vec<String>,
    },

    #[error("{entity}: override conflict at '{field_path}': {reason}")]
    OverrideConflict {
        entity: EntityId,
        field_path: String,
        reason: String,
    },
}

impl EntityError {
    pub fn entity(&self) -> &EntityId {
        match self {
            EntityError::ConfigResolution { entity, .. }
            | EntityError::AmbiguousReference { entity, .. }
            | EntityError::TypeConflict { entity, .. }
            | EntityError::OverrideConflict { entity, .. } => entity,
        }
    }
}

/// Outcome of applying an error policy to a finished generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error("{} entities failed to generate:\n{}", .0.len(), format_errors(.0))]
    Multiple(Vec<EntityError>),
}

fn format_errors(errors: &[EntityError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
