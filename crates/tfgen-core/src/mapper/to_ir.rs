use crate::config::EntityKind;
use crate::ir;
use crate::merge::{AttributeType, CanonicalAttribute, Children, Computability, ElementType, Primitive};

const STRING_VALIDATOR_IMPORT: &str =
    "github.com/hashicorp/terraform-plugin-framework-validators/stringvalidator";

const DEPRECATION_MESSAGE: &str = "This attribute is deprecated by the upstream API.";

/// Serialise a validated tree into an entity schema.
pub(super) fn to_schema(root: &CanonicalAttribute, kind: EntityKind) -> ir::Schema {
    ir::Schema {
        description: non_empty(&root.description),
        attributes: root
            .children()
            .map(|children| attributes(children, kind))
            .unwrap_or_default(),
    }
}

fn attributes(children: &Children, kind: EntityKind) -> Vec<ir::Attribute> {
    children.values().map(|child| attribute(child, kind)).collect()
}

fn attribute(attr: &CanonicalAttribute, kind: EntityKind) -> ir::Attribute {
    let behavior = behavior(attr, kind);
    let ir_kind = match &attr.ty {
        AttributeType::Primitive(p) => primitive_kind(*p, primitive(attr, behavior, kind)),
        AttributeType::List(e) => ir::AttributeKind::List(collection(behavior, e)),
        AttributeType::Set(e) => ir::AttributeKind::Set(collection(behavior, e)),
        AttributeType::Map(e) => ir::AttributeKind::Map(collection(behavior, e)),
        AttributeType::SingleNested(children) => {
            ir::AttributeKind::SingleNested(ir::SingleNestedAttribute {
                behavior,
                attributes: attributes(children, kind),
            })
        }
        AttributeType::ListNested(children) => {
            ir::AttributeKind::ListNested(nested(behavior, children, kind))
        }
        AttributeType::MapNested(children) => {
            ir::AttributeKind::MapNested(nested(behavior, children, kind))
        }
    };
    ir::Attribute {
        name: attr.name.clone(),
        kind: ir_kind,
    }
}

fn behavior(attr: &CanonicalAttribute, kind: EntityKind) -> ir::Behavior {
    let mut behavior = ir::Behavior {
        description: non_empty(&attr.description),
        sensitive: attr.sensitive.then_some(true),
        deprecation_message: attr.deprecated.then(|| DEPRECATION_MESSAGE.to_string()),
        ..Default::default()
    };
    if kind == EntityKind::Provider {
        behavior.optional_required = Some(match attr.computability {
            Computability::Required => ir::OptionalRequired::Required,
            _ => ir::OptionalRequired::Optional,
        });
    } else {
        behavior.computed_optional_required = Some(match attr.computability {
            Computability::Required => ir::ComputedOptionalRequired::Required,
            Computability::Optional => ir::ComputedOptionalRequired::Optional,
            Computability::Computed => ir::ComputedOptionalRequired::Computed,
            Computability::OptionalComputed => ir::ComputedOptionalRequired::ComputedOptional,
        });
    }
    behavior
}

fn primitive(attr: &CanonicalAttribute, behavior: ir::Behavior, kind: EntityKind) -> ir::PrimitiveAttribute {
    let AttributeType::Primitive(p) = attr.ty else {
        return ir::PrimitiveAttribute {
            behavior,
            ..Default::default()
        };
    };

    // Only resources support defaults, and only on attributes the server may fill.
    let default = attr
        .default
        .as_ref()
        .filter(|_| kind == EntityKind::Resource)
        .filter(|_| attr.computability == Computability::OptionalComputed)
        .filter(|value| default_matches(p, value))
        .map(|value| ir::StaticDefault {
            value: value.clone(),
        });

    let validators = if p == Primitive::String
        && !attr.enum_values.is_empty()
        && attr.computability != Computability::Computed
    {
        vec![one_of_validator(&attr.enum_values)]
    } else {
        Vec::new()
    };

    ir::PrimitiveAttribute {
        behavior,
        default,
        validators,
    }
}

fn default_matches(p: Primitive, value: &serde_json::Value) -> bool {
    match p {
        Primitive::Bool => value.is_boolean(),
        Primitive::Int32 | Primitive::Int64 => value.is_i64() || value.is_u64(),
        Primitive::Float32 | Primitive::Float64 | Primitive::Number => value.is_number(),
        Primitive::String => value.is_string(),
    }
}

/// `stringvalidator.OneOf(...)` with one quoted value per line.
fn one_of_validator(values: &[String]) -> ir::Validator {
    let mut definition = String::from("stringvalidator.OneOf(\n");
    for value in values {
        // JSON string escaping is a valid Go interpreted string literal.
        let quoted = serde_json::Value::String(value.clone()).to_string();
        definition.push_str(&quoted);
        definition.push_str(",\n");
    }
    definition.push(')');
    ir::Validator {
        custom: ir::CustomValidator {
            imports: vec![ir::CodeImport {
                path: STRING_VALIDATOR_IMPORT.to_string(),
            }],
            schema_definition: definition,
        },
    }
}

fn primitive_kind(p: Primitive, attr: ir::PrimitiveAttribute) -> ir::AttributeKind {
    match p {
        Primitive::Bool => ir::AttributeKind::Bool(attr),
        Primitive::Number => ir::AttributeKind::Number(attr),
        Primitive::Int32 => ir::AttributeKind::Int32(attr),
        Primitive::Int64 => ir::AttributeKind::Int64(attr),
        Primitive::Float32 => ir::AttributeKind::Float32(attr),
        Primitive::Float64 => ir::AttributeKind::Float64(attr),
        Primitive::String => ir::AttributeKind::String(attr),
    }
}

fn collection(behavior: ir::Behavior, element: &ElementType) -> ir::CollectionAttribute {
    ir::CollectionAttribute {
        behavior,
        element_type: element_type(element),
    }
}

fn nested(behavior: ir::Behavior, children: &Children, kind: EntityKind) -> ir::NestedAttribute {
    ir::NestedAttribute {
        behavior,
        nested_object: ir::NestedObject {
            attributes: attributes(children, kind),
        },
    }
}

fn element_type(element: &ElementType) -> ir::ElementType {
    let inner = |e: &ElementType| {
        Box::new(ir::CollectionElement {
            element_type: element_type(e),
        })
    };
    match element {
        ElementType::Primitive(p) => primitive_element(*p),
        ElementType::List(e) => ir::ElementType::List(inner(e)),
        ElementType::Set(e) => ir::ElementType::Set(inner(e)),
        ElementType::Map(e) => ir::ElementType::Map(inner(e)),
        ElementType::Object(fields) => ir::ElementType::Object(ir::ObjectElement {
            attribute_types: fields
                .iter()
                .map(|(name, e)| ir::ObjectAttributeType {
                    name: name.clone(),
                    element_type: element_type(e),
                })
                .collect(),
        }),
    }
}

fn primitive_element(p: Primitive) -> ir::ElementType {
    let empty = ir::Empty {};
    match p {
        Primitive::Bool => ir::ElementType::Bool(empty),
        Primitive::Number => ir::ElementType::Number(empty),
        Primitive::Int32 => ir::ElementType::Int32(empty),
        Primitive::Int64 => ir::ElementType::Int64(empty),
        Primitive::Float32 => ir::ElementType::Float32(empty),
        Primitive::Float64 => ir::ElementType::Float64(empty),
        Primitive::String => ir::ElementType::String(empty),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
