use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;

/// Who sets a value: the practitioner, the server, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Computability {
    Required,
    Optional,
    Computed,
    #[serde(alias = "computed_optional")]
    OptionalComputed,
}

impl Computability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Computability::Required => "required",
            Computability::Optional => "optional",
            Computability::Computed => "computed",
            Computability::OptionalComputed => "optional_computed",
        }
    }
}

impl fmt::Display for Computability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar Terraform types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Number,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Number => "number",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
        }
    }

    /// Unify two primitives seen for the same field.
    ///
    /// Widening stays inside one numeric family; anything else is a conflict.
    pub fn unify(self, other: Primitive) -> Option<Primitive> {
        use Primitive::*;
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Int32, Int64) | (Int64, Int32) => Some(Int64),
            (Float32, Float64) | (Float64, Float32) => Some(Float64),
            (Number, Float32 | Float64) | (Float32 | Float64, Number) => Some(Number),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type of a collection that is not itself a nested attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Primitive(Primitive),
    List(Box<ElementType>),
    Set(Box<ElementType>),
    Map(Box<ElementType>),
    Object(IndexMap<String, ElementType>),
}

impl ElementType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementType::Primitive(p) => p.as_str(),
            ElementType::List(_) => "list",
            ElementType::Set(_) => "set",
            ElementType::Map(_) => "map",
            ElementType::Object(_) => "object",
        }
    }
}

/// Children of a nested attribute, keyed by source property name.
pub type Children = IndexMap<String, CanonicalAttribute>;

/// The structural type of a canonical attribute.
///
/// Nested variants own their children and collection variants own their
/// element type, so a primitive can never carry either.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    Primitive(Primitive),
    List(ElementType),
    Set(ElementType),
    Map(ElementType),
    SingleNested(Children),
    ListNested(Children),
    MapNested(Children),
}

impl AttributeType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AttributeType::Primitive(p) => p.as_str(),
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
            AttributeType::SingleNested(_) => "single_nested",
            AttributeType::ListNested(_) => "list_nested",
            AttributeType::MapNested(_) => "map_nested",
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            AttributeType::SingleNested(c)
            | AttributeType::ListNested(c)
            | AttributeType::MapNested(c) => Some(c),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            AttributeType::SingleNested(c)
            | AttributeType::ListNested(c)
            | AttributeType::MapNested(c) => Some(c),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&ElementType> {
        match self {
            AttributeType::List(e) | AttributeType::Set(e) | AttributeType::Map(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        self.children().is_some()
    }
}

/// One field of the merged attribute tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalAttribute {
    /// Exposed Terraform name.
    pub name: String,
    /// Property name in the OpenAPI document.
    pub source_name: String,
    pub ty: AttributeType,
    pub computability: Computability,
    pub description: String,
    pub sensitive: bool,
    pub deprecated: bool,
    /// Static default, only kept for primitives.
    pub default: Option<serde_json::Value>,
    /// Allowed string values from `enum`.
    pub enum_values: Vec<String>,
}

impl CanonicalAttribute {
    pub fn new(source_name: &str, ty: AttributeType, computability: Computability) -> Self {
        Self {
            name: crate::naming::terraform_identifier(source_name),
            source_name: source_name.to_string(),
            ty,
            computability,
            description: String::new(),
            sensitive: false,
            deprecated: false,
            default: None,
            enum_values: Vec::new(),
        }
    }

    pub fn children(&self) -> Option<&Children> {
        self.ty.children()
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        self.ty.children_mut()
    }

    /// Child lookup by exposed name or source property name.
    pub fn child(&self, segment: &str) -> Option<&CanonicalAttribute> {
        let children = self.children()?;
        children
            .values()
            .find(|c| c.name == segment)
            .or_else(|| children.get(segment))
    }

    /// Depth of the deepest nested attribute below this one; primitives are 0.
    pub fn nesting_depth(&self) -> usize {
        match self.children() {
            Some(children) => 1 + children.values().map(|c| c.nesting_depth()).max().unwrap_or(0),
            None => 0,
        }
    }
}
