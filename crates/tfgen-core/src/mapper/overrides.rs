use crate::config::{EntityId, OverrideRule};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::merge::{CanonicalAttribute, Children, Computability};
use crate::naming::is_terraform_identifier;

/// Apply rules in declaration order. Rules whose path is missing only warn.
pub(super) fn apply_overrides(
    root: &mut CanonicalAttribute,
    id: &EntityId,
    rules: &[OverrideRule],
    diagnostics: &mut Diagnostics,
) -> Result<(), EntityError> {
    for rule in rules {
        apply_rule(root, id, rule, diagnostics)?;
    }
    Ok(())
}

fn apply_rule(
    root: &mut CanonicalAttribute,
    id: &EntityId,
    rule: &OverrideRule,
    diagnostics: &mut Diagnostics,
) -> Result<(), EntityError> {
    let path = rule.path();
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let located = parent_mut(root, parents).and_then(|(parent, ancestor_computed)| {
        let key = child_key(parent.children()?, last)?;
        Some((parent, key, ancestor_computed))
    });
    let Some((parent, key, ancestor_computed)) = located else {
        let kind = match rule {
            OverrideRule::Ignore { .. } => WarningKind::IgnoredPathNotFound,
            _ => WarningKind::OverridePathNotFound,
        };
        diagnostics.warn(kind, id, path, "no attribute at this path; rule skipped");
        return Ok(());
    };
    let conflict = |reason: String| EntityError::OverrideConflict {
        entity: id.clone(),
        field_path: path.to_string(),
        reason,
    };
    let Some(siblings) = parent.children_mut() else {
        return Ok(());
    };

    match rule {
        OverrideRule::Ignore { .. } => {
            log::debug!("{id}: ignoring '{path}'");
            siblings.shift_remove(&key);
        }
        OverrideRule::Rename { to, .. } => {
            if !is_terraform_identifier(to) {
                return Err(conflict(format!("'{to}' is not a valid Terraform identifier")));
            }
            if let Some((other, _)) = siblings.iter().find(|(k, c)| **k != key && c.name == *to) {
                return Err(conflict(format!(
                    "renaming to '{to}' collides with the attribute from '{other}'"
                )));
            }
            if let Some(target) = siblings.get_mut(&key) {
                target.name = to.clone();
            }
        }
        OverrideRule::ForceComputability { value, .. } => {
            if ancestor_computed && *value == Computability::Required {
                return Err(conflict(
                    "cannot be required below a computed-only attribute".to_string(),
                ));
            }
            if let Some(target) = siblings.get_mut(&key) {
                target.computability = *value;
                if *value == Computability::Computed {
                    cascade_computed(target);
                }
            }
        }
        OverrideRule::SetDescription { text, .. } => {
            if let Some(target) = siblings.get_mut(&key) {
                target.description = text.clone();
            }
        }
    }
    Ok(())
}

/// Key of the child a path segment addresses: exposed name first, then source name.
fn child_key(children: &Children, segment: &str) -> Option<String> {
    children
        .iter()
        .find(|(_, c)| c.name == segment)
        .or_else(|| children.get_key_value(segment))
        .map(|(key, _)| key.clone())
}

/// Walk `segments` from the root. Also reports whether any attribute on the
/// way is computed-only.
fn parent_mut<'t>(
    root: &'t mut CanonicalAttribute,
    segments: &[&str],
) -> Option<(&'t mut CanonicalAttribute, bool)> {
    let mut current = root;
    let mut computed = false;
    for segment in segments {
        let children = current.children_mut()?;
        let key = child_key(children, segment)?;
        current = children.get_mut(&key)?;
        computed |= current.computability == Computability::Computed;
    }
    Some((current, computed))
}

fn cascade_computed(attribute: &mut CanonicalAttribute) {
    if let Some(children) = attribute.children_mut() {
        for child in children.values_mut() {
            child.computability = Computability::Computed;
            cascade_computed(child);
        }
    }
}
