pub mod attributes;
pub mod types;

pub use attributes::*;
pub use types::{DataSource, Provider, Resource, Schema, Specification, IR_VERSION};
