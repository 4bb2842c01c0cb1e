mod resolve;
pub mod types;

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::config::{EntityId, MergeOptions, OptionalReadFields};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::explorer::{EntitySchemaSet, Role};
use crate::parse::DocumentModel;
use crate::parse::schema::SchemaOrRef;
use resolve::{Meta, ObjectShape, Resolved, Shape};

pub use types::*;

/// How many times one schema may be open on the recursion stack before
/// expansion stops. Two yields exactly one level of self-nesting.
const MAX_SCHEMA_OCCURRENCES: usize = 2;

/// Merge an entity's contributions into a root `single_nested` attribute
/// named after the entity.
pub fn merge(
    doc: &DocumentModel,
    set: &EntitySchemaSet,
    options: MergeOptions,
    diagnostics: &mut Diagnostics,
) -> Result<CanonicalAttribute, EntityError> {
    log::debug!("merging {} contribution(s) for {}", set.contributions.len(), set.id);
    let mut merger = Merger {
        doc,
        options,
        entity: &set.id,
        diagnostics,
        active: HashMap::new(),
    };
    let children = merger.merge_entity(set)?;

    let mut root = CanonicalAttribute::new(
        &set.id.name,
        AttributeType::SingleNested(children),
        Computability::Required,
    );
    root.description = set.description.clone().unwrap_or_default();
    Ok(root)
}

/// One schema seen for a field, with the context of the object it came from.
#[derive(Debug, Clone, Copy)]
struct Source<'a> {
    role: Role,
    required: bool,
    schema: &'a SchemaOrRef,
}

/// Broad structural families; a field must stay inside one across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Primitive,
    Array,
    Map,
    Object,
}

fn category(shape: &Shape<'_>) -> Option<Category> {
    match shape {
        Shape::Primitive(_) => Some(Category::Primitive),
        Shape::Array { .. } => Some(Category::Array),
        Shape::Map { .. } => Some(Category::Map),
        Shape::Object(_) => Some(Category::Object),
        Shape::Recursive(_) | Shape::Unresolved { .. } => None,
    }
}

fn is_usable(shape: &Shape<'_>) -> bool {
    category(shape).is_some()
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// `readOnly` schemas never count as something the practitioner writes.
fn effective_role(role: Role, meta: &Meta<'_>) -> Role {
    if meta.read_only { Role::Read } else { role }
}

/// Identities of several resolved schemas, de-duplicated in first-seen order.
/// A collection element after unification.
enum Element {
    Nested(Children),
    Scalar(ElementType),
}

fn identities<'a>(resolved: &[&Resolved<'a>]) -> Vec<&'a str> {
    let ids: IndexSet<&'a str> = resolved
        .iter()
        .flat_map(|r| r.identities.iter().copied())
        .collect();
    ids.into_iter().collect()
}

struct Merger<'a, 'd> {
    doc: &'a DocumentModel,
    options: MergeOptions,
    entity: &'a EntityId,
    diagnostics: &'d mut Diagnostics,
    /// Schema identities currently being expanded, with their open count.
    active: HashMap<&'a str, usize>,
}

impl<'a> Merger<'a, '_> {
    fn occurrences(&self, id: &str) -> usize {
        self.active.get(id).copied().unwrap_or(0)
    }

    /// Run `f` with `ids` pushed onto the recursion stack.
    fn nested<T>(&mut self, ids: Vec<&'a str>, f: impl FnOnce(&mut Self) -> T) -> T {
        for id in &ids {
            *self.active.entry(*id).or_insert(0) += 1;
        }
        let out = f(self);
        for id in &ids {
            if let Some(count) = self.active.get_mut(id) {
                *count -= 1;
                if *count == 0 {
                    self.active.remove(id);
                }
            }
        }
        out
    }

    fn warn(&mut self, kind: WarningKind, path: &str, message: impl Into<String>) {
        self.diagnostics.warn(kind, self.entity, path, message);
    }

    fn report_unusable(&mut self, path: &str, shape: &Shape<'a>) {
        match shape {
            Shape::Recursive(id) => self.warn(
                WarningKind::RecursiveSchema,
                path,
                format!("{id} is already being expanded; nesting stops here"),
            ),
            Shape::Unresolved { kind, reason } => {
                let message = format!("{reason}; field dropped");
                self.warn(*kind, path, message)
            }
            _ => {}
        }
    }

    fn merge_entity(&mut self, set: &'a EntitySchemaSet) -> Result<Children, EntityError> {
        let mut roots: Vec<(Role, Resolved<'a>)> = Vec::new();
        for contribution in &set.contributions {
            let resolved = self.resolve(&contribution.schema);
            match resolved.shape {
                Shape::Object(_) => roots.push((contribution.role, resolved)),
                ref other => {
                    let message = format!(
                        "{} schema is {}, not an object; contribution skipped",
                        contribution.describe(),
                        other.type_name()
                    );
                    self.warn(WarningKind::UnsupportedSchema, "", message);
                }
            }
        }

        let ids = identities(&roots.iter().map(|(_, r)| r).collect::<Vec<_>>());
        let objects: Vec<(Role, ObjectShape<'a>)> = roots
            .into_iter()
            .filter_map(|(role, resolved)| match resolved.shape {
                Shape::Object(object) => Some((effective_role(role, &resolved.meta), object)),
                _ => None,
            })
            .collect();
        self.nested(ids, |merger| merger.merge_objects("", &objects))
    }

    /// Union the fields of several objects, in first-seen order.
    fn merge_objects(
        &mut self,
        path: &str,
        objects: &[(Role, ObjectShape<'a>)],
    ) -> Result<Children, EntityError> {
        let names: IndexSet<&'a str> = objects
            .iter()
            .flat_map(|(_, object)| object.properties.keys().copied())
            .collect();

        let mut children = Children::new();
        for name in names {
            let sources: Vec<Source<'a>> = objects
                .iter()
                .filter_map(|(role, object)| {
                    object.properties.get(&name).map(|schema| Source {
                        role: *role,
                        required: object.is_required(name),
                        schema: *schema,
                    })
                })
                .collect();
            let field_path = child_path(path, name);
            if let Some(attribute) = self.merge_field(&field_path, name, &sources)? {
                children.insert(name.to_string(), attribute);
            }
        }
        Ok(children)
    }

    fn merge_field(
        &mut self,
        path: &str,
        name: &str,
        sources: &[Source<'a>],
    ) -> Result<Option<CanonicalAttribute>, EntityError> {
        let resolved: Vec<(Source<'a>, Resolved<'a>)> = sources
            .iter()
            .map(|source| (*source, self.resolve(source.schema)))
            .collect();

        if let Some((_, bad)) = resolved.iter().find(|(_, r)| !is_usable(&r.shape)) {
            self.report_unusable(path, &bad.shape);
            return Ok(None);
        }

        let mut meta = Meta::default();
        for (_, r) in &resolved {
            meta.absorb(&r.meta);
        }
        let computability = self.computability(&resolved, &meta);

        let ids = identities(&resolved.iter().map(|(_, r)| r).collect::<Vec<_>>());
        let Some(ty) = self.nested(ids, |merger| merger.unify_attribute(path, &resolved))? else {
            return Ok(None);
        };

        let mut attribute = CanonicalAttribute::new(name, ty, computability);
        attribute.description = meta.description.unwrap_or_default().to_string();
        attribute.sensitive = meta.sensitive;
        attribute.deprecated = meta.deprecated;
        if let AttributeType::Primitive(primitive) = attribute.ty {
            attribute.default = meta.default.cloned();
            if primitive == Primitive::String {
                attribute.enum_values = meta.enum_values.iter().map(|v| v.to_string()).collect();
            }
        }
        Ok(Some(attribute))
    }

    fn computability(&self, resolved: &[(Source<'a>, Resolved<'a>)], meta: &Meta<'a>) -> Computability {
        let writes: Vec<&Source<'a>> = resolved
            .iter()
            .filter(|(s, r)| effective_role(s.role, &r.meta) == Role::Write)
            .map(|(s, _)| s)
            .collect();
        let read = resolved.iter().any(|(s, _)| s.role == Role::Read);
        let lookup = resolved.iter().any(|(s, _)| s.role == Role::Lookup);

        if writes.is_empty() {
            if lookup {
                Computability::OptionalComputed
            } else {
                Computability::Computed
            }
        } else if writes.iter().any(|s| s.required) {
            Computability::Required
        } else if meta.default.is_some() || lookup {
            Computability::OptionalComputed
        } else if read {
            match self.options.optional_read_fields {
                OptionalReadFields::Optional => Computability::Optional,
                OptionalReadFields::OptionalComputed => Computability::OptionalComputed,
            }
        } else {
            Computability::Optional
        }
    }

    /// All shapes must share one category; the conflict names every distinct type.
    fn common_category(&self, path: &str, shapes: &[&Shape<'a>]) -> Result<Category, EntityError> {
        let mut categories = shapes.iter().filter_map(|s| category(s));
        let first = categories.next().unwrap_or(Category::Object);
        if categories.all(|c| c == first) {
            Ok(first)
        } else {
            Err(self.conflict(path, shapes))
        }
    }

    fn conflict(&self, path: &str, shapes: &[&Shape<'a>]) -> EntityError {
        let names: IndexSet<&'static str> = shapes.iter().map(|s| s.type_name()).collect();
        EntityError::TypeConflict {
            entity: self.entity.clone(),
            field_path: path.to_string(),
            conflicting_types: names.into_iter().map(String::from).collect(),
        }
    }

    fn unify_primitives(&self, path: &str, shapes: &[&Shape<'a>]) -> Result<Primitive, EntityError> {
        let mut unified: Option<Primitive> = None;
        for shape in shapes {
            let Shape::Primitive(p) = shape else {
                return Err(self.conflict(path, shapes));
            };
            unified = match unified {
                None => Some(*p),
                Some(prev) => Some(prev.unify(*p).ok_or_else(|| self.conflict(path, shapes))?),
            };
        }
        unified.ok_or_else(|| self.conflict(path, shapes))
    }

    fn unify_attribute(
        &mut self,
        path: &str,
        resolved: &[(Source<'a>, Resolved<'a>)],
    ) -> Result<Option<AttributeType>, EntityError> {
        let shapes: Vec<&Shape<'a>> = resolved.iter().map(|(_, r)| &r.shape).collect();
        match self.common_category(path, &shapes)? {
            Category::Primitive => Ok(Some(AttributeType::Primitive(
                self.unify_primitives(path, &shapes)?,
            ))),
            Category::Object => {
                let objects: Vec<(Role, ObjectShape<'a>)> = resolved
                    .iter()
                    .filter_map(|(s, r)| match &r.shape {
                        Shape::Object(o) => Some((effective_role(s.role, &r.meta), o.clone())),
                        _ => None,
                    })
                    .collect();
                Ok(Some(AttributeType::SingleNested(
                    self.merge_objects(path, &objects)?,
                )))
            }
            Category::Array => {
                let unique = shapes
                    .iter()
                    .all(|s| matches!(s, Shape::Array { unique: true, .. }));
                let items: Vec<Source<'a>> = resolved
                    .iter()
                    .filter_map(|(s, r)| match r.shape {
                        Shape::Array { items, .. } => Some(Source {
                            role: effective_role(s.role, &r.meta),
                            required: false,
                            schema: items,
                        }),
                        _ => None,
                    })
                    .collect();
                self.unify_collection(path, &items, unique)
            }
            Category::Map => {
                let values: Vec<Source<'a>> = resolved
                    .iter()
                    .filter_map(|(s, r)| match r.shape {
                        Shape::Map { values } => Some(Source {
                            role: effective_role(s.role, &r.meta),
                            required: false,
                            schema: values,
                        }),
                        _ => None,
                    })
                    .collect();
                self.unify_map(path, &values)
            }
        }
    }

    /// Resolve element schemas; `None` after reporting when one is unusable.
    fn resolve_elements(
        &mut self,
        path: &str,
        elements: &[Source<'a>],
    ) -> Option<Vec<(Source<'a>, Resolved<'a>)>> {
        let resolved: Vec<(Source<'a>, Resolved<'a>)> = elements
            .iter()
            .map(|source| (*source, self.resolve(source.schema)))
            .collect();
        if let Some((_, bad)) = resolved.iter().find(|(_, r)| !is_usable(&r.shape)) {
            self.report_unusable(path, &bad.shape);
            return None;
        }
        Some(resolved)
    }

    /// Objects become nested attributes; anything else becomes an element type.
    fn nested_or_element(
        &mut self,
        path: &str,
        elements: &[Source<'a>],
    ) -> Result<Option<Element>, EntityError> {
        let Some(resolved) = self.resolve_elements(path, elements) else {
            return Ok(None);
        };
        let ids = identities(&resolved.iter().map(|(_, r)| r).collect::<Vec<_>>());
        self.nested(ids, |merger| -> Result<Option<Element>, EntityError> {
            let shapes: Vec<&Shape<'a>> = resolved.iter().map(|(_, r)| &r.shape).collect();
            if merger.common_category(path, &shapes)? == Category::Object {
                let objects: Vec<(Role, ObjectShape<'a>)> = resolved
                    .iter()
                    .filter_map(|(s, r)| match &r.shape {
                        Shape::Object(o) => Some((effective_role(s.role, &r.meta), o.clone())),
                        _ => None,
                    })
                    .collect();
                return Ok(Some(Element::Nested(merger.merge_objects(path, &objects)?)));
            }
            let resolved: Vec<Resolved<'a>> = resolved.into_iter().map(|(_, r)| r).collect();
            Ok(merger.unify_elements(path, &resolved)?.map(Element::Scalar))
        })
    }

    fn unify_collection(
        &mut self,
        path: &str,
        items: &[Source<'a>],
        unique: bool,
    ) -> Result<Option<AttributeType>, EntityError> {
        Ok(self.nested_or_element(path, items)?.map(|unified| match unified {
            Element::Nested(children) => AttributeType::ListNested(children),
            Element::Scalar(element @ ElementType::Primitive(_)) if unique => {
                AttributeType::Set(element)
            }
            Element::Scalar(element) => AttributeType::List(element),
        }))
    }

    fn unify_map(
        &mut self,
        path: &str,
        values: &[Source<'a>],
    ) -> Result<Option<AttributeType>, EntityError> {
        Ok(self.nested_or_element(path, values)?.map(|unified| match unified {
            Element::Nested(children) => AttributeType::MapNested(children),
            Element::Scalar(element) => AttributeType::Map(element),
        }))
    }

    /// Element types for collections nested inside collections.
    fn unify_elements(
        &mut self,
        path: &str,
        resolved: &[Resolved<'a>],
    ) -> Result<Option<ElementType>, EntityError> {
        if let Some(bad) = resolved.iter().find(|r| !is_usable(&r.shape)) {
            self.report_unusable(path, &bad.shape);
            return Ok(None);
        }
        let shapes: Vec<&Shape<'a>> = resolved.iter().map(|r| &r.shape).collect();
        let category = self.common_category(path, &shapes)?;
        if category == Category::Primitive {
            return Ok(Some(ElementType::Primitive(self.unify_primitives(path, &shapes)?)));
        }

        let ids = identities(&resolved.iter().collect::<Vec<_>>());
        self.nested(ids, |merger| merger.compound_element(path, category, &shapes))
    }

    fn compound_element(
        &mut self,
        path: &str,
        category: Category,
        shapes: &[&Shape<'a>],
    ) -> Result<Option<ElementType>, EntityError> {
        if category == Category::Object {
            let objects: Vec<&ObjectShape<'a>> = shapes
                .iter()
                .filter_map(|s| match s {
                    Shape::Object(o) => Some(o),
                    _ => None,
                })
                .collect();
            return self.element_object(path, &objects);
        }

        let inner: Vec<Resolved<'a>> = shapes
            .iter()
            .filter_map(|s| match **s {
                Shape::Array { items, .. } => Some(self.resolve(items)),
                Shape::Map { values } => Some(self.resolve(values)),
                _ => None,
            })
            .collect();
        let unique = shapes
            .iter()
            .all(|s| matches!(s, Shape::Array { unique: true, .. }));
        let Some(element) = self.unify_elements(path, &inner)? else {
            return Ok(None);
        };
        Ok(Some(match category {
            Category::Map => ElementType::Map(Box::new(element)),
            _ if unique && matches!(element, ElementType::Primitive(_)) => {
                ElementType::Set(Box::new(element))
            }
            _ => ElementType::List(Box::new(element)),
        }))
    }

    fn element_object(
        &mut self,
        path: &str,
        objects: &[&ObjectShape<'a>],
    ) -> Result<Option<ElementType>, EntityError> {
        let names: IndexSet<&'a str> = objects
            .iter()
            .flat_map(|o| o.properties.keys().copied())
            .collect();
        let mut fields = indexmap::IndexMap::new();
        let mut sources: HashMap<String, &'a str> = HashMap::new();
        for name in names {
            let field_path = child_path(path, name);
            let resolved: Vec<Resolved<'a>> = objects
                .iter()
                .filter_map(|o| o.properties.get(&name).copied())
                .map(|schema| self.resolve(schema))
                .collect();
            let Some(element) = self.unify_elements(&field_path, &resolved)? else {
                continue;
            };
            let key = crate::naming::terraform_identifier(name);
            if let Some(previous) = sources.insert(key.clone(), name) {
                return Err(EntityError::OverrideConflict {
                    entity: self.entity.clone(),
                    field_path,
                    reason: format!("'{previous}' and '{name}' both expose the name '{key}'"),
                });
            }
            fields.insert(key, element);
        }
        if fields.is_empty() {
            self.warn(
                WarningKind::EmptyNestedDropped,
                path,
                "object element has no usable fields",
            );
            return Ok(None);
        }
        Ok(Some(ElementType::Object(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntityKind, PolymorphismPolicy};
    use crate::explorer::{Contribution, SchemaSource};
    use crate::parse;

    const DOC: &str = r##"
openapi: 3.0.3
info: { title: Merge, version: "1" }
paths: {}
components:
  schemas:
    NewThing:
      type: object
      required: [name]
      properties:
        name: { type: string, description: Display name }
        size: { type: integer }
    Thing:
      type: object
      properties:
        name: { type: string }
        size: { type: integer }
        id: { type: string }
    StringValue:
      type: object
      properties:
        value: { type: string }
    IntValue:
      type: object
      properties:
        value: { type: integer }
    ObjectValue:
      type: object
      properties:
        value:
          type: object
          properties:
            inner: { type: string }
    Node:
      type: object
      properties:
        name: { type: string }
        children:
          type: array
          items: { $ref: '#/components/schemas/Node' }
    Extended:
      allOf:
        - $ref: '#/components/schemas/NewThing'
        - type: object
          required: [id]
          properties:
            id: { type: string, readOnly: true }
    Collections:
      type: object
      properties:
        tags:
          type: array
          uniqueItems: true
          items: { type: string }
        rules:
          type: array
          uniqueItems: true
          items: { $ref: '#/components/schemas/Thing' }
        labels:
          type: object
          additionalProperties: { type: string }
        owners:
          type: object
          additionalProperties: { $ref: '#/components/schemas/Thing' }
        matrix:
          type: array
          items:
            type: array
            items: { type: number, format: float }
        free:
          type: object
          additionalProperties: true
        status:
          type: string
          enum: [active, retired]
          default: active
    Narrow:
      type: object
      required: [count]
      properties:
        count: { type: integer, format: int32 }
        secret: { type: string, format: password }
    Wide:
      type: object
      properties:
        count: { type: integer, format: int64 }
    Poly:
      type: object
      properties:
        value:
          oneOf:
            - { type: string }
            - { type: integer }
        maybe:
          oneOf:
            - { type: "null" }
            - { type: string }
        shape:
          oneOf:
            - type: object
              required: [kind, radius]
              properties:
                kind: { type: string }
                radius: { type: number }
            - type: object
              required: [kind]
              properties:
                kind: { type: string }
                side: { type: number }
    Grid:
      type: object
      properties:
        cells:
          type: array
          items:
            type: array
            items:
              type: object
              properties:
                fooBar: { type: string }
                foo_bar: { type: integer }
    DecimalPrice:
      type: object
      properties:
        amount: { type: number, format: decimal }
    PlainPrice:
      type: object
      properties:
        amount: { type: number }
"##;

    fn doc() -> DocumentModel {
        DocumentModel::new(parse::from_yaml(DOC).unwrap())
    }

    fn schema(name: &str) -> SchemaOrRef {
        SchemaOrRef::reference(format!("#/components/schemas/{name}"))
    }

    fn set_of(contributions: &[(&str, Role)]) -> EntitySchemaSet {
        let mut set = EntitySchemaSet::new(EntityId::new(EntityKind::Resource, "thing"));
        for (name, role) in contributions {
            set.contributions.push(Contribution {
                verb: None,
                source: match role {
                    Role::Write => SchemaSource::RequestBody,
                    Role::Read => SchemaSource::ResponseBody,
                    Role::Lookup => SchemaSource::Parameters,
                },
                role: *role,
                schema: schema(name),
            });
        }
        set
    }

    fn run(
        contributions: &[(&str, Role)],
        options: MergeOptions,
    ) -> (Result<CanonicalAttribute, EntityError>, Diagnostics) {
        let doc = doc();
        let mut diags = Diagnostics::new();
        let result = merge(&doc, &set_of(contributions), options, &mut diags);
        (result, diags)
    }

    fn summary(root: &CanonicalAttribute) -> Vec<(String, &'static str, Computability)> {
        root.children()
            .unwrap()
            .values()
            .map(|c| (c.name.clone(), c.ty.kind_name(), c.computability))
            .collect()
    }

    #[test]
    fn create_and_read_unify_with_computability() {
        let (root, diags) = run(
            &[("NewThing", Role::Write), ("Thing", Role::Read)],
            MergeOptions::default(),
        );
        let root = root.unwrap();
        assert_eq!(
            summary(&root),
            vec![
                ("name".to_string(), "string", Computability::Required),
                ("size".to_string(), "int64", Computability::Optional),
                ("id".to_string(), "string", Computability::Computed),
            ]
        );
        assert_eq!(root.child("name").unwrap().description, "Display name");
        assert!(diags.is_empty());
    }

    #[test]
    fn lookup_parameters_are_optional_computed() {
        let (root, _) = run(
            &[
                ("NewThing", Role::Write),
                ("Thing", Role::Read),
                ("StringValue", Role::Lookup),
            ],
            MergeOptions::default(),
        );
        let root = root.unwrap();
        assert_eq!(
            root.child("value").unwrap().computability,
            Computability::OptionalComputed
        );
        assert_eq!(root.child("id").unwrap().computability, Computability::Computed);
        assert_eq!(root.child("size").unwrap().computability, Computability::Optional);
    }

    #[test]
    fn decimal_and_plain_numbers_unify() {
        let (root, _) = run(
            &[("DecimalPrice", Role::Write), ("PlainPrice", Role::Read)],
            MergeOptions::default(),
        );
        let root = root.unwrap();
        assert_eq!(root.child("amount").unwrap().ty.kind_name(), "number");
    }

    #[test]
    fn colliding_names_inside_element_objects_conflict() {
        let (result, _) = run(&[("Grid", Role::Read)], MergeOptions::default());
        match result {
            Err(EntityError::OverrideConflict {
                field_path, reason, ..
            }) => {
                assert!(field_path.starts_with("cells"));
                assert!(field_path.ends_with("foo_bar"));
                assert!(reason.contains("'fooBar'"));
                assert!(reason.contains("'foo_bar'"));
            }
            other => panic!("expected OverrideConflict, got {other:?}"),
        }
    }

    #[test]
    fn optional_read_fields_can_be_computed() {
        let options = MergeOptions {
            optional_read_fields: OptionalReadFields::OptionalComputed,
            ..Default::default()
        };
        let (root, _) = run(&[("NewThing", Role::Write), ("Thing", Role::Read)], options);
        assert_eq!(
            root.unwrap().child("size").unwrap().computability,
            Computability::OptionalComputed
        );
    }

    #[test]
    fn incompatible_types_conflict() {
        let (result, _) = run(
            &[("StringValue", Role::Write), ("IntValue", Role::Read)],
            MergeOptions::default(),
        );
        match result {
            Err(EntityError::TypeConflict {
                field_path,
                conflicting_types,
                ..
            }) => {
                assert_eq!(field_path, "value");
                assert_eq!(conflicting_types, vec!["string", "int64"]);
            }
            other => panic!("expected TypeConflict, got {other:?}"),
        }

        let (result, _) = run(
            &[("StringValue", Role::Write), ("ObjectValue", Role::Read)],
            MergeOptions::default(),
        );
        assert!(matches!(result, Err(EntityError::TypeConflict { .. })));
    }

    #[test]
    fn contribution_order_does_not_change_types() {
        let forward = run(
            &[("Narrow", Role::Write), ("Wide", Role::Read), ("Thing", Role::Read)],
            MergeOptions::default(),
        )
        .0
        .unwrap();
        let backward = run(
            &[("Thing", Role::Read), ("Wide", Role::Read), ("Narrow", Role::Write)],
            MergeOptions::default(),
        )
        .0
        .unwrap();
        let mut a = summary(&forward);
        let mut b = summary(&backward);
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_widening_and_sensitivity() {
        let (root, _) = run(
            &[("Narrow", Role::Write), ("Wide", Role::Read)],
            MergeOptions::default(),
        );
        let root = root.unwrap();
        let count = root.child("count").unwrap();
        assert_eq!(count.ty, AttributeType::Primitive(Primitive::Int64));
        assert_eq!(count.computability, Computability::Required);
        assert!(root.child("secret").unwrap().sensitive);
    }

    #[test]
    fn self_reference_stops_at_second_occurrence() {
        let (root, diags) = run(&[("Node", Role::Read)], MergeOptions::default());
        let root = root.unwrap();
        assert_eq!(root.nesting_depth(), 2);

        let children = root.child("children").unwrap();
        assert_eq!(children.ty.kind_name(), "list_nested");
        let grandchildren: Vec<&String> = children.children().unwrap().keys().collect();
        assert_eq!(grandchildren, vec!["name"]);

        let recursive: Vec<_> = diags.of_kind(WarningKind::RecursiveSchema).collect();
        assert_eq!(recursive.len(), 1);
        assert_eq!(recursive[0].path, "children.children");
    }

    #[test]
    fn all_of_merges_parts_and_honours_read_only() {
        let (root, _) = run(&[("Extended", Role::Write)], MergeOptions::default());
        assert_eq!(
            summary(&root.unwrap()),
            vec![
                ("name".to_string(), "string", Computability::Required),
                ("size".to_string(), "int64", Computability::Optional),
                ("id".to_string(), "string", Computability::Computed),
            ]
        );
    }

    #[test]
    fn collections_maps_and_defaults() {
        let (root, diags) = run(&[("Collections", Role::Write)], MergeOptions::default());
        let root = root.unwrap();

        assert_eq!(
            root.child("tags").unwrap().ty,
            AttributeType::Set(ElementType::Primitive(Primitive::String))
        );
        assert_eq!(root.child("rules").unwrap().ty.kind_name(), "list_nested");
        assert_eq!(
            root.child("labels").unwrap().ty,
            AttributeType::Map(ElementType::Primitive(Primitive::String))
        );
        assert_eq!(root.child("owners").unwrap().ty.kind_name(), "map_nested");
        assert_eq!(
            root.child("matrix").unwrap().ty,
            AttributeType::List(ElementType::List(Box::new(ElementType::Primitive(
                Primitive::Float32
            ))))
        );
        assert!(root.child("free").is_none());
        assert_eq!(diags.of_kind(WarningKind::UnsupportedSchema).count(), 1);

        let status = root.child("status").unwrap();
        assert_eq!(status.computability, Computability::OptionalComputed);
        assert_eq!(status.default, Some(serde_json::json!("active")));
        assert_eq!(status.enum_values, vec!["active", "retired"]);
    }

    #[test]
    fn polymorphism_drop_is_the_default() {
        let (root, diags) = run(&[("Poly", Role::Write)], MergeOptions::default());
        let root = root.unwrap();
        assert!(root.child("value").is_none());
        assert!(root.child("shape").is_none());
        assert_eq!(
            root.child("maybe").unwrap().ty,
            AttributeType::Primitive(Primitive::String)
        );
        assert_eq!(diags.of_kind(WarningKind::UnresolvedPolymorphism).count(), 2);
    }

    #[test]
    fn polymorphism_first_takes_first_branch() {
        let options = MergeOptions {
            polymorphism: PolymorphismPolicy::First,
            ..Default::default()
        };
        let (root, _) = run(&[("Poly", Role::Write)], options);
        let root = root.unwrap();
        assert_eq!(
            root.child("value").unwrap().ty,
            AttributeType::Primitive(Primitive::String)
        );
        let shape: Vec<&String> = root.child("shape").unwrap().children().unwrap().keys().collect();
        assert_eq!(shape, vec!["kind", "radius"]);
    }

    #[test]
    fn polymorphism_merge_objects_unions_branches() {
        let options = MergeOptions {
            polymorphism: PolymorphismPolicy::MergeObjects,
            ..Default::default()
        };
        let (root, diags) = run(&[("Poly", Role::Write)], options);
        let root = root.unwrap();
        let shape = root.child("shape").unwrap();
        assert_eq!(
            summary(shape),
            vec![
                ("kind".to_string(), "string", Computability::Required),
                ("radius".to_string(), "float64", Computability::Optional),
                ("side".to_string(), "float64", Computability::Optional),
            ]
        );
        // Primitive branches still cannot be merged.
        assert!(root.child("value").is_none());
        assert_eq!(diags.of_kind(WarningKind::UnresolvedPolymorphism).count(), 1);
    }
}
