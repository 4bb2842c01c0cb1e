mod overrides;
mod to_ir;
mod validate;

use crate::config::{EntityId, EntityKind, OverrideRule};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::ir;
use crate::merge::{CanonicalAttribute, Computability};

/// Apply `rules` to a merged tree and run structural validation.
pub fn apply(
    mut root: CanonicalAttribute,
    id: &EntityId,
    rules: &[OverrideRule],
    diagnostics: &mut Diagnostics,
) -> Result<CanonicalAttribute, EntityError> {
    if id.kind == EntityKind::Provider {
        relax_provider(&mut root, "", id, diagnostics);
    }
    overrides::apply_overrides(&mut root, id, rules, diagnostics)?;
    validate::validate(&mut root, id, diagnostics)?;
    Ok(root)
}

/// Lower a validated tree into the IR schema for an entity of `kind`.
pub fn to_schema(root: &CanonicalAttribute, kind: EntityKind) -> ir::Schema {
    to_ir::to_schema(root, kind)
}

/// Apply, validate, and lower in one step.
pub fn map_entity(
    root: CanonicalAttribute,
    id: &EntityId,
    rules: &[OverrideRule],
    diagnostics: &mut Diagnostics,
) -> Result<ir::Schema, EntityError> {
    let root = apply(root, id, rules, diagnostics)?;
    Ok(to_schema(&root, id.kind))
}

/// Provider configuration is never filled in by a server: values the merger
/// inferred as server-defaulted become plain optional, and read-only values
/// are removed.
fn relax_provider(
    attribute: &mut CanonicalAttribute,
    path: &str,
    id: &EntityId,
    diagnostics: &mut Diagnostics,
) {
    let Some(children) = attribute.children_mut() else {
        return;
    };
    children.retain(|key, child| {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        match child.computability {
            Computability::Computed => {
                diagnostics.warn(
                    WarningKind::UnsupportedSchema,
                    id,
                    &child_path,
                    "read-only values cannot be provider configuration; attribute removed",
                );
                return false;
            }
            Computability::OptionalComputed => child.computability = Computability::Optional,
            Computability::Required | Computability::Optional => {}
        }
        child.default = None;
        relax_provider(child, &child_path, id, diagnostics);
        true
    });
}
