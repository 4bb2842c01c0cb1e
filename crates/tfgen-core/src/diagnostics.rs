use std::fmt;

use crate::config::EntityId;

/// Non-fatal conditions. The affected field or entity is degraded but
/// generation continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A self-referential schema was cut off.
    RecursiveSchema,
    /// `oneOf`/`anyOf` could not be reduced to one type.
    UnresolvedPolymorphism,
    /// A declared operation has no body schema for its verb.
    MissingVerbSchema,
    /// A schema shape with no Terraform equivalent (untyped, free-form, remote ref).
    UnsupportedSchema,
    /// An `ignore` rule addressed a path that does not exist.
    IgnoredPathNotFound,
    /// A rename, computability or description rule addressed a missing path.
    OverridePathNotFound,
    /// A nested attribute ended up with no children and was removed.
    EmptyNestedDropped,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::RecursiveSchema => "recursive-schema",
            WarningKind::UnresolvedPolymorphism => "unresolved-polymorphism",
            WarningKind::MissingVerbSchema => "missing-verb-schema",
            WarningKind::UnsupportedSchema => "unsupported-schema",
            WarningKind::IgnoredPathNotFound => "ignored-path-not-found",
            WarningKind::OverridePathNotFound => "override-path-not-found",
            WarningKind::EmptyNestedDropped => "empty-nested-dropped",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub entity: EntityId,
    /// Dot-separated field path; empty when the warning concerns the whole entity.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}] {}", self.kind, self.entity)?;
        if !self.path.is_empty() {
            write!(f, " at '{}'", self.path)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered, de-duplicated warning sink threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(
        &mut self,
        kind: WarningKind,
        entity: &EntityId,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        let warning = Warning {
            kind,
            entity: entity.clone(),
            path: path.into(),
            message: message.into(),
        };
        if self.warnings.contains(&warning) {
            return;
        }
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityKind;

    #[test]
    fn duplicate_warnings_are_collapsed() {
        let entity = EntityId::new(EntityKind::Resource, "pet");
        let mut diags = Diagnostics::new();
        diags.warn(WarningKind::IgnoredPathNotFound, &entity, "tags", "no such attribute");
        diags.warn(WarningKind::IgnoredPathNotFound, &entity, "tags", "no such attribute");
        diags.warn(WarningKind::RecursiveSchema, &entity, "tags", "cycle");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.of_kind(WarningKind::RecursiveSchema).count(), 1);
    }

    #[test]
    fn display_is_prefixed_by_kind() {
        let entity = EntityId::new(EntityKind::DataSource, "pets");
        let mut diags = Diagnostics::new();
        diags.warn(WarningKind::MissingVerbSchema, &entity, "", "read has no 2xx body");
        diags.warn(WarningKind::RecursiveSchema, &entity, "node.children", "cycle");
        let lines: Vec<String> = diags.warnings().iter().map(|w| w.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "warning[missing-verb-schema] data source 'pets': read has no 2xx body",
                "warning[recursive-schema] data source 'pets' at 'node.children': cycle",
            ]
        );
    }
}
