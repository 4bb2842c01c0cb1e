use serde::Serialize;

use super::attributes::Attribute;

/// Version of the IR contract this crate emits.
pub const IR_VERSION: &str = "0.1";

/// The complete IR document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Specification {
    pub version: String,
    pub provider: Provider,
    pub resources: Vec<Resource>,
    pub data_sources: Vec<DataSource>,
}

impl Specification {
    pub fn new(provider: Provider) -> Self {
        Self {
            version: IR_VERSION.to_string(),
            provider,
            resources: Vec::new(),
            data_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provider {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSource {
    pub name: String,
    pub schema: Schema,
}

/// Top-level schema of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub attributes: Vec<Attribute>,
}
