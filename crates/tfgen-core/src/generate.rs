use serde::Serialize;
use serde::ser::Error as _;

use crate::config::{Config, EntityDescriptor, EntityKind};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{EntityError, GenerateError};
use crate::explorer::Explorer;
use crate::ir::{self, Specification};
use crate::mapper;
use crate::merge;
use crate::parse::DocumentModel;

/// What to do when at least one entity failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the first failure only.
    #[default]
    FailFast,
    /// Report every failure together.
    CollectAll,
}

/// Result of a generation run: the entities that succeeded, plus every
/// error and warning in configuration order.
#[derive(Debug, Clone)]
pub struct Report {
    pub specification: Specification,
    pub errors: Vec<EntityError>,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Turn the report into the specification, or an error under `policy`.
    pub fn finish(self, policy: ErrorPolicy) -> Result<Specification, GenerateError> {
        if self.errors.is_empty() {
            return Ok(self.specification);
        }
        let mut errors = self.errors;
        match policy {
            ErrorPolicy::FailFast => Err(GenerateError::Entity(errors.remove(0))),
            ErrorPolicy::CollectAll => Err(GenerateError::Multiple(errors)),
        }
    }
}

/// Generate the IR for every entity in `config`.
pub fn generate(doc: &DocumentModel, config: &Config) -> Report {
    let explorer = Explorer::new(doc, config);
    let mut diagnostics = Diagnostics::new();
    let mut errors = Vec::new();

    let mut run = |descriptor: &EntityDescriptor, diagnostics: &mut Diagnostics| {
        let result = build_entity(doc, config, &explorer, descriptor, diagnostics);
        match result {
            Ok(schema) => Some(schema),
            Err(err) => {
                log::debug!("{} failed: {err}", descriptor.id);
                errors.push(err);
                None
            }
        }
    };

    let provider = config
        .entities(EntityKind::Provider)
        .into_iter()
        .next()
        .map(|descriptor| ir::Provider {
            schema: run(&descriptor, &mut diagnostics)
                .filter(|schema| !schema.attributes.is_empty() || schema.description.is_some()),
            name: descriptor.id.name,
        })
        .unwrap_or_else(|| ir::Provider {
            name: config.provider.name.clone(),
            schema: None,
        });
    let mut specification = Specification::new(provider);

    for descriptor in config.entities(EntityKind::Resource) {
        if let Some(schema) = run(&descriptor, &mut diagnostics) {
            specification.resources.push(ir::Resource {
                name: descriptor.id.name,
                schema,
            });
        }
    }
    for descriptor in config.entities(EntityKind::DataSource) {
        if let Some(schema) = run(&descriptor, &mut diagnostics) {
            specification.data_sources.push(ir::DataSource {
                name: descriptor.id.name,
                schema,
            });
        }
    }

    Report {
        specification,
        errors,
        warnings: diagnostics.into_warnings(),
    }
}

fn build_entity(
    doc: &DocumentModel,
    config: &Config,
    explorer: &Explorer<'_>,
    descriptor: &EntityDescriptor,
    diagnostics: &mut Diagnostics,
) -> Result<ir::Schema, EntityError> {
    let set = explorer.explore(descriptor, diagnostics)?;
    let root = merge::merge(doc, &set, config.merge, diagnostics)?;
    mapper::map_entity(root, &descriptor.id, &descriptor.overrides, diagnostics)
}

/// Serialise a specification as tab-indented JSON with a trailing newline.
pub fn to_json(specification: &Specification) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    specification.serialize(&mut serializer)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const DOC: &str = r##"
openapi: 3.0.3
info: { title: Generate, version: "1" }
paths:
  /things:
    post:
      operationId: createThing
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required: [name]
              properties:
                name: { type: string }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                type: object
                properties:
                  id: { type: string }
                  name: { type: string }
"##;

    fn doc() -> DocumentModel {
        DocumentModel::new(parse::from_yaml(DOC).unwrap())
    }

    #[test]
    fn failures_are_scoped_to_their_entity() {
        let config = Config::from_yaml(
            r#"
provider: { name: acme }
resources:
  ghost:
    read: { path: /ghosts, method: GET }
  thing:
    create: { operation_id: createThing }
  phantom:
    create: { operation_id: missing }
"#,
        )
        .unwrap();
        let report = generate(&doc(), &config);

        assert_eq!(report.specification.resources.len(), 1);
        assert_eq!(report.specification.resources[0].name, "thing");
        let failed: Vec<&str> = report.errors.iter().map(|e| e.entity().name.as_str()).collect();
        assert_eq!(failed, vec!["ghost", "phantom"]);

        match report.clone().finish(ErrorPolicy::FailFast) {
            Err(GenerateError::Entity(err)) => assert_eq!(err.entity().name, "ghost"),
            other => panic!("expected first error, got {other:?}"),
        }
        match report.finish(ErrorPolicy::CollectAll) {
            Err(GenerateError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected all errors, got {other:?}"),
        }
    }

    #[test]
    fn json_output_is_tab_indented_and_newline_terminated() {
        let config = Config::from_yaml(
            "provider: { name: acme }\nresources:\n  thing:\n    create: { operation_id: createThing }\n",
        )
        .unwrap();
        let spec = generate(&doc(), &config).finish(ErrorPolicy::FailFast).unwrap();
        let json = to_json(&spec).unwrap();
        assert!(json.starts_with("{\n\t\"version\": \"0.1\",\n\t\"provider\": {\n\t\t\"name\": \"acme\"\n\t},"));
        assert!(json.ends_with("}\n"));
        assert_eq!(json, to_json(&spec).unwrap());
    }
}
