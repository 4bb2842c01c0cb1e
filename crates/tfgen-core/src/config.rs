use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::merge::Computability;
use crate::naming::is_terraform_identifier;
use crate::parse::operation::HttpMethod;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "tfgen.yaml";

/// Which kind of Terraform entity a config entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Resource,
    DataSource,
    Provider,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Resource => "resource",
            EntityKind::DataSource => "data source",
            EntityKind::Provider => "provider",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind + name; names are unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityId {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// CRUD verb an operation locator is bound to.
///
/// Declaration order here is the tie-breaking order used when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level generator configuration loaded from `tfgen.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceConfig>,
    #[serde(default)]
    pub data_sources: IndexMap<String, DataSourceConfig>,
    #[serde(default)]
    pub merge: MergeOptions,
}

/// Points at one operation in the OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationLocator {
    pub path: Option<String>,
    pub method: Option<HttpMethod>,
    pub operation_id: Option<String>,
}

impl OperationLocator {
    pub fn path(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: Some(path.into()),
            method: Some(method),
            operation_id: None,
        }
    }

    pub fn operation_id(id: impl Into<String>) -> Self {
        Self {
            operation_id: Some(id.into()),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), String> {
        match (&self.path, &self.operation_id) {
            (Some(_), Some(_)) => Err("set either `path` or `operation_id`, not both".into()),
            (None, None) => Err("one of `path` or `operation_id` is required".into()),
            (None, Some(_)) if self.method.is_some() => {
                Err("`method` is only valid together with `path`".into())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for OperationLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.method, &self.operation_id) {
            (Some(path), Some(method), _) => write!(f, "{method} {path}"),
            (Some(path), None, _) => write!(f, "{path}"),
            (None, _, Some(id)) => write!(f, "operationId '{id}'"),
            (None, _, None) => write!(f, "<empty locator>"),
        }
    }
}

/// A resource: up to four CRUD operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub create: Option<OperationLocator>,
    pub read: Option<OperationLocator>,
    pub update: Option<OperationLocator>,
    pub delete: Option<OperationLocator>,
    pub schema: SchemaOptions,
    pub schema_overrides: Vec<OverrideRule>,
}

/// A data source: a single read operation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    pub read: Option<OperationLocator>,
    pub schema: SchemaOptions,
    pub schema_overrides: Vec<OverrideRule>,
}

/// The provider block: its schema comes from components, not operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    /// A `#/components/schemas/...` pointer.
    pub schema_ref: Option<String>,
    /// Security scheme names exposed as provider attributes.
    pub security_schemes: Vec<String>,
    /// Component parameter names (usually headers) exposed as provider attributes.
    pub header_parameters: Vec<String>,
    pub schema: SchemaOptions,
    pub schema_overrides: Vec<OverrideRule>,
}

/// Shorthand override blocks, desugared into [`OverrideRule`]s.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    pub ignores: Vec<String>,
    pub attributes: AttributeOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttributeOptions {
    /// Attribute path → new name.
    pub aliases: IndexMap<String, String>,
    pub overrides: IndexMap<String, AttributeOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AttributeOverride {
    pub description: Option<String>,
    pub computability: Option<Computability>,
}

/// One user-supplied edit to a merged attribute tree.
///
/// Paths are dot-separated; each segment matches an attribute's exposed name
/// or the property name it came from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum OverrideRule {
    Ignore { path: String },
    Rename { path: String, to: String },
    ForceComputability { path: String, value: Computability },
    SetDescription { path: String, text: String },
}

impl OverrideRule {
    pub fn path(&self) -> &str {
        match self {
            OverrideRule::Ignore { path }
            | OverrideRule::Rename { path, .. }
            | OverrideRule::ForceComputability { path, .. }
            | OverrideRule::SetDescription { path, .. } => path,
        }
    }
}

impl SchemaOptions {
    /// Ignores, then aliases, then per-attribute overrides.
    fn to_rules(&self) -> Vec<OverrideRule> {
        let mut rules: Vec<OverrideRule> = self
            .ignores
            .iter()
            .map(|path| OverrideRule::Ignore { path: path.clone() })
            .collect();
        rules.extend(
            self.attributes
                .aliases
                .iter()
                .map(|(path, to)| OverrideRule::Rename {
                    path: path.clone(),
                    to: to.clone(),
                }),
        );
        for (path, ov) in &self.attributes.overrides {
            if let Some(ref text) = ov.description {
                rules.push(OverrideRule::SetDescription {
                    path: path.clone(),
                    text: text.clone(),
                });
            }
            if let Some(value) = ov.computability {
                rules.push(OverrideRule::ForceComputability {
                    path: path.clone(),
                    value,
                });
            }
        }
        rules
    }
}

/// How `oneOf`/`anyOf` with several usable branches is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolymorphismPolicy {
    /// Warn and drop the field.
    #[default]
    Drop,
    /// Use the first usable branch.
    First,
    /// Merge object branches field by field; a field is required only when
    /// every branch requires it. Non-object branches fall back to `Drop`.
    MergeObjects,
}

/// Computability of a field that is optional in a write body and also
/// returned by a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalReadFields {
    #[default]
    Optional,
    OptionalComputed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub polymorphism: PolymorphismPolicy,
    pub optional_read_fields: OptionalReadFields,
}

/// A flattened view of one configured entity.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub id: EntityId,
    /// Declared operations in verb order.
    pub operations: Vec<(Verb, OperationLocator)>,
    pub overrides: Vec<OverrideRule>,
}

impl ResourceConfig {
    pub fn operations(&self) -> Vec<(Verb, &OperationLocator)> {
        [
            (Verb::Create, &self.create),
            (Verb::Read, &self.read),
            (Verb::Update, &self.update),
            (Verb::Delete, &self.delete),
        ]
        .into_iter()
        .filter_map(|(verb, loc)| loc.as_ref().map(|l| (verb, l)))
        .collect()
    }
}

impl DataSourceConfig {
    pub fn operations(&self) -> Vec<(Verb, &OperationLocator)> {
        self.read.iter().map(|l| (Verb::Read, l)).collect()
    }
}

fn with_rules(schema: &SchemaOptions, explicit: &[OverrideRule]) -> Vec<OverrideRule> {
    let mut rules = schema.to_rules();
    rules.extend(explicit.iter().cloned());
    rules
}

impl Config {
    /// Parse and validate a config from YAML text.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml_ng::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.name.trim().is_empty() {
            return Err(ConfigError::MissingProviderName);
        }
        check_name(EntityKind::Provider, &self.provider.name)?;

        for (name, resource) in &self.resources {
            check_name(EntityKind::Resource, name)?;
            let ops = resource.operations();
            if ops.is_empty() {
                return Err(ConfigError::NoOperations {
                    kind: EntityKind::Resource,
                    entity: name.clone(),
                });
            }
            check_locators(EntityKind::Resource, name, &ops)?;
        }

        for (name, data_source) in &self.data_sources {
            check_name(EntityKind::DataSource, name)?;
            let ops = data_source.operations();
            if ops.is_empty() {
                return Err(ConfigError::MissingRead {
                    entity: name.clone(),
                });
            }
            check_locators(EntityKind::DataSource, name, &ops)?;
        }

        for descriptor in self
            .entities(EntityKind::Provider)
            .into_iter()
            .chain(self.entities(EntityKind::Resource))
            .chain(self.entities(EntityKind::DataSource))
        {
            if let Some(index) = descriptor
                .overrides
                .iter()
                .position(|rule| rule.path().trim().is_empty())
            {
                return Err(ConfigError::EmptyRulePath {
                    entity: descriptor.id,
                    index,
                });
            }
        }
        Ok(())
    }

    /// Entities of one kind in declaration order.
    pub fn entities(&self, kind: EntityKind) -> Vec<EntityDescriptor> {
        match kind {
            EntityKind::Resource => self
                .resources
                .iter()
                .map(|(name, r)| EntityDescriptor {
                    id: EntityId::new(kind, name),
                    operations: own(r.operations()),
                    overrides: with_rules(&r.schema, &r.schema_overrides),
                })
                .collect(),
            EntityKind::DataSource => self
                .data_sources
                .iter()
                .map(|(name, d)| EntityDescriptor {
                    id: EntityId::new(kind, name),
                    operations: own(d.operations()),
                    overrides: with_rules(&d.schema, &d.schema_overrides),
                })
                .collect(),
            EntityKind::Provider => vec![EntityDescriptor {
                id: EntityId::new(kind, &self.provider.name),
                operations: Vec::new(),
                overrides: with_rules(&self.provider.schema, &self.provider.schema_overrides),
            }],
        }
    }
}

fn own(ops: Vec<(Verb, &OperationLocator)>) -> Vec<(Verb, OperationLocator)> {
    ops.into_iter().map(|(v, l)| (v, l.clone())).collect()
}

fn check_name(kind: EntityKind, name: &str) -> Result<(), ConfigError> {
    if is_terraform_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            kind,
            entity: name.to_string(),
        })
    }
}

fn check_locators(
    kind: EntityKind,
    name: &str,
    ops: &[(Verb, &OperationLocator)],
) -> Result<(), ConfigError> {
    for (verb, locator) in ops {
        locator
            .validate()
            .map_err(|reason| ConfigError::InvalidLocator {
                kind,
                entity: name.to_string(),
                verb: verb.to_string(),
                reason,
            })?;
    }
    Ok(())
}

/// Load and validate config from a YAML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# tfgen configuration
provider:
  name: example
  # schema_ref: '#/components/schemas/ProviderConfig'
  # security_schemes: [api_key]
  # header_parameters: [X-Tenant-Id]

resources:
  thing:
    create:
      path: /things
      method: POST
    read:
      path: /things/{id}
      method: GET
    # update:
    #   operation_id: updateThing
    # delete:
    #   path: /things/{id}
    #   method: DELETE
    schema:
      ignores: []
      attributes:
        aliases: {}
          # thingId: id
        overrides: {}
          # name:
          #   description: Human readable name
          #   computability: required
    schema_overrides: []
      # - rule: set_description
      #   path: status
      #   text: Lifecycle status

data_sources: {}
  # things:
  #   read:
  #     path: /things
  #     method: GET

merge:
  polymorphism: drop              # drop | first | merge_objects
  optional_read_fields: optional  # optional | optional_computed
"#
}
