use indexmap::IndexMap;

use super::types::Primitive;
use super::{MAX_SCHEMA_OCCURRENCES, Merger};
use crate::config::PolymorphismPolicy;
use crate::diagnostics::WarningKind;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef, SchemaType};

/// A schema after reference and composition resolution.
#[derive(Debug, Clone)]
pub(super) struct Resolved<'a> {
    pub shape: Shape<'a>,
    pub meta: Meta<'a>,
    /// `$ref` pointers passed through while resolving; they stay on the
    /// recursion stack while this schema's children are merged.
    pub identities: Vec<&'a str>,
}

impl<'a> Resolved<'a> {
    fn bare(shape: Shape<'a>) -> Self {
        Self {
            shape,
            meta: Meta::default(),
            identities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(super) enum Shape<'a> {
    Primitive(Primitive),
    Array {
        items: &'a SchemaOrRef,
        unique: bool,
    },
    Map {
        values: &'a SchemaOrRef,
    },
    Object(ObjectShape<'a>),
    /// Expansion stopped: this schema is already on the recursion stack.
    Recursive(&'a str),
    Unresolved {
        kind: WarningKind,
        reason: String,
    },
}

impl Shape<'_> {
    fn unresolved(kind: WarningKind, reason: impl Into<String>) -> Self {
        Shape::Unresolved {
            kind,
            reason: reason.into(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Primitive(p) => p.as_str(),
            Shape::Array { .. } => "array",
            Shape::Map { .. } => "map",
            Shape::Object(_) => "object",
            Shape::Recursive(_) => "recursive",
            Shape::Unresolved { .. } => "unresolved",
        }
    }
}

/// Properties of an object schema, flattened across `allOf` parts.
#[derive(Debug, Clone, Default)]
pub(super) struct ObjectShape<'a> {
    pub properties: IndexMap<&'a str, &'a SchemaOrRef>,
    pub required: Vec<&'a str>,
}

impl<'a> ObjectShape<'a> {
    fn of(schema: &'a Schema) -> Self {
        Self {
            properties: schema
                .properties
                .iter()
                .map(|(name, prop)| (name.as_str(), prop))
                .collect(),
            required: schema.required.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| *r == name)
    }

    /// `allOf` semantics: every part applies, so required sets union.
    fn absorb(&mut self, other: ObjectShape<'a>) {
        for (name, prop) in other.properties {
            self.properties.entry(name).or_insert(prop);
        }
        for name in other.required {
            if !self.required.contains(&name) {
                self.required.push(name);
            }
        }
    }
}

/// Field metadata gathered alongside the shape.
#[derive(Debug, Clone, Default)]
pub(super) struct Meta<'a> {
    pub description: Option<&'a str>,
    pub read_only: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub default: Option<&'a serde_json::Value>,
    pub enum_values: Vec<&'a str>,
}

impl<'a> Meta<'a> {
    fn of(schema: &'a Schema) -> Self {
        let write_only = schema.write_only == Some(true);
        Self {
            description: schema.description.as_deref().filter(|d| !d.trim().is_empty()),
            read_only: schema.read_only == Some(true),
            sensitive: write_only || schema.format.as_deref() == Some("password"),
            deprecated: schema.deprecated == Some(true),
            default: schema.default_value.as_ref(),
            enum_values: schema
                .enum_values
                .iter()
                .filter_map(|v| v.as_str())
                .collect(),
        }
    }

    /// Fill gaps from `other`; values already set win.
    pub fn absorb(&mut self, other: &Meta<'a>) {
        self.description = self.description.or(other.description);
        self.read_only |= other.read_only;
        self.sensitive |= other.sensitive;
        self.deprecated |= other.deprecated;
        self.default = self.default.or(other.default);
        if self.enum_values.is_empty() {
            self.enum_values = other.enum_values.clone();
        }
    }
}

impl<'a> Merger<'a, '_> {
    /// Resolve one schema against the current recursion stack.
    pub(super) fn resolve(&self, schema: &'a SchemaOrRef) -> Resolved<'a> {
        let mut chain = Vec::new();
        self.resolve_in(schema, &mut chain)
    }

    fn resolve_in(&self, schema_or_ref: &'a SchemaOrRef, chain: &mut Vec<&'a str>) -> Resolved<'a> {
        let resolved = match self.doc.resolve_schema(schema_or_ref) {
            Ok(resolved) => resolved,
            Err(err) => {
                return Resolved::bare(Shape::unresolved(
                    WarningKind::UnsupportedSchema,
                    err.to_string(),
                ));
            }
        };

        let mut identities = Vec::new();
        if let Some(id) = resolved.identity {
            if chain.contains(&id) || self.occurrences(id) >= MAX_SCHEMA_OCCURRENCES {
                return Resolved::bare(Shape::Recursive(id));
            }
            identities.push(id);
            chain.push(id);
        }

        let schema = resolved.schema;
        let mut meta = Meta::of(schema);
        let shape = self.shape_of(schema, chain, &mut identities, &mut meta);

        if resolved.identity.is_some() {
            chain.pop();
        }
        Resolved {
            shape,
            meta,
            identities,
        }
    }

    fn shape_of(
        &self,
        schema: &'a Schema,
        chain: &mut Vec<&'a str>,
        identities: &mut Vec<&'a str>,
        meta: &mut Meta<'a>,
    ) -> Shape<'a> {
        if !schema.all_of.is_empty() {
            return self.all_of_shape(schema, chain, identities, meta);
        }
        let variants = if schema.one_of.is_empty() {
            &schema.any_of
        } else {
            &schema.one_of
        };
        if !variants.is_empty() {
            return self.polymorphic_shape(variants, chain, identities, meta);
        }
        typed_shape(schema)
    }

    fn all_of_shape(
        &self,
        schema: &'a Schema,
        chain: &mut Vec<&'a str>,
        identities: &mut Vec<&'a str>,
        meta: &mut Meta<'a>,
    ) -> Shape<'a> {
        let mut parts = Vec::new();
        for branch in &schema.all_of {
            let resolved = self.resolve_in(branch, chain);
            identities.extend(resolved.identities);
            meta.absorb(&resolved.meta);
            match resolved.shape {
                shape @ (Shape::Recursive(_) | Shape::Unresolved { .. }) => return shape,
                shape => parts.push(shape),
            }
        }
        if !schema.properties.is_empty() {
            parts.push(Shape::Object(ObjectShape::of(schema)));
        }

        if parts.len() == 1 {
            return parts.remove(0);
        }
        if parts.iter().all(|p| matches!(p, Shape::Object(_))) {
            let mut merged = ObjectShape::default();
            for part in parts {
                if let Shape::Object(object) = part {
                    merged.absorb(object);
                }
            }
            return Shape::Object(merged);
        }
        let primitive = parts.iter().try_fold(None, |acc: Option<Primitive>, part| match part {
            Shape::Primitive(p) => match acc {
                None => Some(Some(*p)),
                Some(prev) => prev.unify(*p).map(Some),
            },
            _ => None,
        });
        match primitive {
            Some(Some(p)) => Shape::Primitive(p),
            _ => Shape::unresolved(
                WarningKind::UnsupportedSchema,
                "allOf combines incompatible shapes",
            ),
        }
    }

    fn polymorphic_shape(
        &self,
        variants: &'a [SchemaOrRef],
        chain: &mut Vec<&'a str>,
        identities: &mut Vec<&'a str>,
        meta: &mut Meta<'a>,
    ) -> Shape<'a> {
        let mut usable: Vec<Resolved<'a>> = Vec::new();
        for branch in variants {
            if self.is_null_schema(branch) {
                continue;
            }
            let resolved = self.resolve_in(branch, chain);
            if !matches!(resolved.shape, Shape::Unresolved { .. }) {
                usable.push(resolved);
            }
        }

        let chosen = match usable.len() {
            0 => {
                return Shape::unresolved(
                    WarningKind::UnresolvedPolymorphism,
                    "no oneOf/anyOf branch resolves to a concrete type",
                );
            }
            1 => usable.remove(0),
            n => match self.options.polymorphism {
                PolymorphismPolicy::Drop => {
                    return Shape::unresolved(
                        WarningKind::UnresolvedPolymorphism,
                        format!(
                            "{n} oneOf/anyOf branches are resolvable; field dropped \
                             (merge.polymorphism selects another policy)"
                        ),
                    );
                }
                PolymorphismPolicy::First => usable.remove(0),
                PolymorphismPolicy::MergeObjects => return merge_object_branches(usable, identities, meta),
            },
        };

        identities.extend(chosen.identities);
        meta.absorb(&chosen.meta);
        chosen.shape
    }

    fn is_null_schema(&self, branch: &'a SchemaOrRef) -> bool {
        self.doc
            .resolve_schema(branch)
            .ok()
            .and_then(|r| r.schema.schema_type.as_ref())
            .is_some_and(|ts| ts.non_null().is_empty())
    }
}

/// Union of object branches; a field is required only if every branch requires it.
fn merge_object_branches<'a>(
    branches: Vec<Resolved<'a>>,
    identities: &mut Vec<&'a str>,
    meta: &mut Meta<'a>,
) -> Shape<'a> {
    if !branches.iter().all(|b| matches!(b.shape, Shape::Object(_))) {
        return Shape::unresolved(
            WarningKind::UnresolvedPolymorphism,
            "oneOf/anyOf branches are not all objects and cannot be merged",
        );
    }

    let objects: Vec<ObjectShape<'a>> = branches
        .into_iter()
        .filter_map(|branch| {
            identities.extend(branch.identities);
            meta.absorb(&branch.meta);
            match branch.shape {
                Shape::Object(object) => Some(object),
                _ => None,
            }
        })
        .collect();

    let mut merged = ObjectShape::default();
    for object in &objects {
        for (name, prop) in &object.properties {
            merged.properties.entry(*name).or_insert(*prop);
        }
    }
    merged.required = merged
        .properties
        .keys()
        .copied()
        .filter(|name| objects.iter().all(|o| o.is_required(name)))
        .collect();
    Shape::Object(merged)
}

fn typed_shape(schema: &Schema) -> Shape<'_> {
    let Some(type_set) = schema.schema_type.as_ref() else {
        return untyped_shape(schema);
    };
    match type_set.non_null().as_slice() {
        [] => Shape::unresolved(WarningKind::UnsupportedSchema, "schema only allows null"),
        [single] => match single {
            SchemaType::String => Shape::Primitive(Primitive::String),
            SchemaType::Boolean => Shape::Primitive(Primitive::Bool),
            SchemaType::Integer => Shape::Primitive(integer_width(schema.format.as_deref())),
            SchemaType::Number => Shape::Primitive(number_width(schema.format.as_deref())),
            SchemaType::Array => array_shape(schema),
            SchemaType::Object => object_shape(schema),
            SchemaType::Null => {
                Shape::unresolved(WarningKind::UnsupportedSchema, "schema only allows null")
            }
        },
        many => Shape::unresolved(
            WarningKind::UnresolvedPolymorphism,
            format!(
                "schema allows several types: {}",
                many.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            ),
        ),
    }
}

/// No `type` keyword: infer from the keywords that are present.
fn untyped_shape(schema: &Schema) -> Shape<'_> {
    if !schema.properties.is_empty() {
        object_shape(schema)
    } else if schema.items.is_some() {
        array_shape(schema)
    } else if matches!(
        schema.additional_properties,
        Some(AdditionalProperties::Schema(_))
    ) {
        object_shape(schema)
    } else if !schema.enum_values.is_empty() && schema.enum_values.iter().all(|v| v.is_string()) {
        Shape::Primitive(Primitive::String)
    } else {
        Shape::unresolved(WarningKind::UnsupportedSchema, "schema declares no type")
    }
}

fn integer_width(format: Option<&str>) -> Primitive {
    match format {
        Some("int32") => Primitive::Int32,
        _ => Primitive::Int64,
    }
}

fn number_width(format: Option<&str>) -> Primitive {
    match format {
        Some("float") => Primitive::Float32,
        Some("decimal") => Primitive::Number,
        _ => Primitive::Float64,
    }
}

fn array_shape(schema: &Schema) -> Shape<'_> {
    match schema.items.as_deref() {
        Some(items) => Shape::Array {
            items,
            unique: schema.unique_items == Some(true),
        },
        None => Shape::unresolved(WarningKind::UnsupportedSchema, "array declares no items"),
    }
}

fn object_shape(schema: &Schema) -> Shape<'_> {
    if !schema.properties.is_empty() {
        return Shape::Object(ObjectShape::of(schema));
    }
    match schema.additional_properties.as_ref() {
        Some(AdditionalProperties::Schema(values)) => Shape::Map { values },
        Some(AdditionalProperties::Bool(true)) => Shape::unresolved(
            WarningKind::UnsupportedSchema,
            "free-form object with untyped values",
        ),
        _ => Shape::Object(ObjectShape::default()),
    }
}
