use std::collections::HashMap;

use crate::config::{EntityId, EntityKind};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::merge::{CanonicalAttribute, Children, Computability};

/// Structural checks run after all overrides.
///
/// Nested attributes left without children are dropped with a warning;
/// everything else that cannot be expressed in the IR is an error.
pub(super) fn validate(
    root: &mut CanonicalAttribute,
    id: &EntityId,
    diagnostics: &mut Diagnostics,
) -> Result<(), EntityError> {
    if let Some(children) = root.children_mut() {
        prune_empty(children, "", id, diagnostics);
    }
    check_children(root, "", false, id)
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn prune_empty(children: &mut Children, path: &str, id: &EntityId, diagnostics: &mut Diagnostics) {
    children.retain(|key, child| {
        let child_path = join(path, key);
        let kind = child.ty.kind_name();
        match child.children_mut() {
            Some(grandchildren) => {
                prune_empty(grandchildren, &child_path, id, diagnostics);
                if grandchildren.is_empty() {
                    diagnostics.warn(
                        WarningKind::EmptyNestedDropped,
                        id,
                        &child_path,
                        format!("{kind} attribute has no attributes left and was removed"),
                    );
                    return false;
                }
                true
            }
            None => true,
        }
    });
}

fn check_children(
    parent: &CanonicalAttribute,
    path: &str,
    parent_computed: bool,
    id: &EntityId,
) -> Result<(), EntityError> {
    let Some(children) = parent.children() else {
        return Ok(());
    };
    let conflict = |field_path: String, reason: String| EntityError::OverrideConflict {
        entity: id.clone(),
        field_path,
        reason,
    };

    let mut exposed: HashMap<&str, &str> = HashMap::new();
    for (key, child) in children {
        let child_path = join(path, key);
        if let Some(previous) = exposed.insert(child.name.as_str(), key.as_str()) {
            return Err(conflict(
                child_path,
                format!("'{previous}' and '{key}' both expose the name '{}'", child.name),
            ));
        }
        if parent_computed && child.computability == Computability::Required {
            return Err(conflict(
                child_path,
                "required attribute below a computed-only attribute".to_string(),
            ));
        }
        if id.kind == EntityKind::Provider
            && matches!(
                child.computability,
                Computability::Computed | Computability::OptionalComputed
            )
        {
            return Err(conflict(
                child_path,
                format!("provider attributes cannot be {}", child.computability),
            ));
        }
        let computed = parent_computed || child.computability == Computability::Computed;
        check_children(child, &child_path, computed, id)?;
    }
    Ok(())
}
