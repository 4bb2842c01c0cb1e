use serde::Serialize;

/// One attribute entry: `{"name": ..., "<kind>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Bool(PrimitiveAttribute),
    Float32(PrimitiveAttribute),
    Float64(PrimitiveAttribute),
    Int32(PrimitiveAttribute),
    Int64(PrimitiveAttribute),
    Number(PrimitiveAttribute),
    String(PrimitiveAttribute),
    List(CollectionAttribute),
    Set(CollectionAttribute),
    Map(CollectionAttribute),
    ListNested(NestedAttribute),
    MapNested(NestedAttribute),
    SingleNested(SingleNestedAttribute),
}

impl AttributeKind {
    pub fn behavior(&self) -> &Behavior {
        match self {
            AttributeKind::Bool(a)
            | AttributeKind::Float32(a)
            | AttributeKind::Float64(a)
            | AttributeKind::Int32(a)
            | AttributeKind::Int64(a)
            | AttributeKind::Number(a)
            | AttributeKind::String(a) => &a.behavior,
            AttributeKind::List(a) | AttributeKind::Set(a) | AttributeKind::Map(a) => &a.behavior,
            AttributeKind::ListNested(a) | AttributeKind::MapNested(a) => &a.behavior,
            AttributeKind::SingleNested(a) => &a.behavior,
        }
    }

    /// Child attributes of nested kinds.
    pub fn attributes(&self) -> Option<&[Attribute]> {
        match self {
            AttributeKind::ListNested(a) | AttributeKind::MapNested(a) => {
                Some(&a.nested_object.attributes)
            }
            AttributeKind::SingleNested(a) => Some(&a.attributes),
            _ => None,
        }
    }
}

/// Resource and data source attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputedOptionalRequired {
    Required,
    Optional,
    Computed,
    ComputedOptional,
}

/// Provider attributes, which can never be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalRequired {
    Required,
    Optional,
}

/// Settings shared by every attribute kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Behavior {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_optional_required: Option<ComputedOptionalRequired>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_required: Option<OptionalRequired>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrimitiveAttribute {
    #[serde(flatten)]
    pub behavior: Behavior,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<StaticDefault>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionAttribute {
    #[serde(flatten)]
    pub behavior: Behavior,
    pub element_type: ElementType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedAttribute {
    #[serde(flatten)]
    pub behavior: Behavior,
    pub nested_object: NestedObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NestedObject {
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleNestedAttribute {
    #[serde(flatten)]
    pub behavior: Behavior,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticDefault {
    #[serde(rename = "static")]
    pub value: serde_json::Value,
}

/// Element type of a collection: `{"string": {}}`, `{"list": {"element_type": ...}}`, ...
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Bool(Empty),
    Float32(Empty),
    Float64(Empty),
    Int32(Empty),
    Int64(Empty),
    Number(Empty),
    String(Empty),
    List(Box<CollectionElement>),
    Set(Box<CollectionElement>),
    Map(Box<CollectionElement>),
    Object(ObjectElement),
}

/// Serialises as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionElement {
    pub element_type: ElementType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectElement {
    pub attribute_types: Vec<ObjectAttributeType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectAttributeType {
    pub name: String,
    #[serde(flatten)]
    pub element_type: ElementType,
}

/// A validator the downstream generator emits verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validator {
    pub custom: CustomValidator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomValidator {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<CodeImport>,
    pub schema_definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeImport {
    pub path: String,
}
