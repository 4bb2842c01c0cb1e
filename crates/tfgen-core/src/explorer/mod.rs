mod provider;

use std::fmt;

use indexmap::IndexMap;

use crate::config::{Config, EntityDescriptor, EntityId, EntityKind, OperationLocator, Verb};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::parse::DocumentModel;
use crate::parse::media_type::preferred_media_type;
use crate::parse::operation::{HttpMethod, Operation};
use crate::parse::spec::{Parameter, ParameterLocation};
use crate::parse::response::is_success_status;
use crate::parse::schema::{Schema, SchemaOrRef, SchemaType, TypeSet};

/// Whether a schema describes values the practitioner writes or values the
/// server returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Write,
    Read,
    /// Read-operation parameters of a resource: the practitioner may supply
    /// them, otherwise the server assigns them.
    Lookup,
}

/// Where in the document a contributed schema was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaSource {
    RequestBody,
    ResponseBody,
    Parameters,
    ProviderSchema,
    Credentials,
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaSource::RequestBody => "request body",
            SchemaSource::ResponseBody => "response body",
            SchemaSource::Parameters => "parameters",
            SchemaSource::ProviderSchema => "provider schema",
            SchemaSource::Credentials => "credentials",
        })
    }
}

/// One schema that contributes attributes to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// `None` for provider contributions, which come from components.
    pub verb: Option<Verb>,
    pub source: SchemaSource,
    pub role: Role,
    pub schema: SchemaOrRef,
}

impl Contribution {
    pub fn describe(&self) -> String {
        match self.verb {
            Some(verb) => format!("{verb} {}", self.source),
            None => self.source.to_string(),
        }
    }
}

/// Everything the merger needs to know about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchemaSet {
    pub id: EntityId,
    /// Verbs that resolved to an operation, in verb order.
    pub verbs: Vec<Verb>,
    /// Contributions in verb order; the merger's tie-breaking order.
    pub contributions: Vec<Contribution>,
    pub description: Option<String>,
}

impl EntitySchemaSet {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            verbs: Vec::new(),
            contributions: Vec::new(),
            description: None,
        }
    }

    fn contribute(&mut self, verb: Option<Verb>, source: SchemaSource, role: Role, schema: SchemaOrRef) {
        self.contributions.push(Contribution {
            verb,
            source,
            role,
            schema,
        });
    }
}

/// Walks the document under configuration guidance.
pub struct Explorer<'a> {
    doc: &'a DocumentModel,
    config: &'a Config,
}

impl<'a> Explorer<'a> {
    pub fn new(doc: &'a DocumentModel, config: &'a Config) -> Self {
        Self { doc, config }
    }

    /// Collect schema sets for every entity of `kind`, in configuration order.
    ///
    /// Failures are per entity; one unresolvable locator does not stop the rest.
    pub fn find(
        &self,
        kind: EntityKind,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Result<EntitySchemaSet, EntityError>> {
        self.config
            .entities(kind)
            .iter()
            .map(|descriptor| self.explore(descriptor, diagnostics))
            .collect()
    }

    /// Explore a single configured entity.
    pub fn explore(
        &self,
        descriptor: &EntityDescriptor,
        diagnostics: &mut Diagnostics,
    ) -> Result<EntitySchemaSet, EntityError> {
        log::debug!("exploring {}", descriptor.id);
        match descriptor.id.kind {
            EntityKind::Provider => {
                provider::explore_provider(
                    self.doc,
                    &self.config.provider,
                    &descriptor.id,
                    diagnostics,
                )
            }
            EntityKind::Resource | EntityKind::DataSource => {
                self.explore_operations(descriptor, diagnostics)
            }
        }
    }

    fn explore_operations(
        &self,
        descriptor: &EntityDescriptor,
        diagnostics: &mut Diagnostics,
    ) -> Result<EntitySchemaSet, EntityError> {
        let id = &descriptor.id;
        let mut set = EntitySchemaSet::new(id.clone());

        // Resolve every locator first so a bad one fails the entity before any work.
        let mut resolved = Vec::with_capacity(descriptor.operations.len());
        for (verb, locator) in &descriptor.operations {
            let located = self.locate(id, locator)?;
            resolved.push((*verb, locator, located));
        }

        for (verb, locator, located) in resolved {
            set.verbs.push(verb);
            if set.description.is_none() && matches!(verb, Verb::Create | Verb::Read) {
                set.description = operation_description(located.operation);
            }
            match verb {
                Verb::Create => {
                    self.contribute_request_body(&mut set, verb, locator, &located, diagnostics);
                    if let Some(schema) = self.response_schema(id, &located, diagnostics) {
                        set.contribute(Some(verb), SchemaSource::ResponseBody, Role::Read, schema.clone());
                    }
                }
                Verb::Update => {
                    self.contribute_request_body(&mut set, verb, locator, &located, diagnostics);
                }
                Verb::Read => {
                    self.contribute_read(&mut set, locator, &located, diagnostics);
                }
                Verb::Delete => {}
            }
        }
        Ok(set)
    }

    fn contribute_request_body(
        &self,
        set: &mut EntitySchemaSet,
        verb: Verb,
        locator: &OperationLocator,
        located: &Located<'a>,
        diagnostics: &mut Diagnostics,
    ) {
        match self.request_schema(&set.id, located, diagnostics) {
            Some(schema) => {
                set.contribute(Some(verb), SchemaSource::RequestBody, Role::Write, schema.clone())
            }
            None => diagnostics.warn(
                WarningKind::MissingVerbSchema,
                &set.id,
                "",
                format!("{verb} operation {locator} has no request body schema"),
            ),
        }
    }

    fn contribute_read(
        &self,
        set: &mut EntitySchemaSet,
        locator: &OperationLocator,
        located: &Located<'a>,
        diagnostics: &mut Diagnostics,
    ) {
        let is_data_source = set.id.kind == EntityKind::DataSource;
        match self.response_schema(&set.id, located, diagnostics) {
            Some(schema) if is_data_source && self.is_object_array(schema) => {
                let mut wrapper = Schema {
                    schema_type: Some(TypeSet::Single(SchemaType::Object)),
                    ..Default::default()
                };
                wrapper.properties.insert(set.id.name.clone(), schema.clone());
                set.contribute(
                    Some(Verb::Read),
                    SchemaSource::ResponseBody,
                    Role::Read,
                    SchemaOrRef::inline(wrapper),
                );
            }
            Some(schema) => set.contribute(
                Some(Verb::Read),
                SchemaSource::ResponseBody,
                Role::Read,
                schema.clone(),
            ),
            None => diagnostics.warn(
                WarningKind::MissingVerbSchema,
                &set.id,
                "",
                format!("read operation {locator} has no success response schema"),
            ),
        }

        let role = if is_data_source { Role::Write } else { Role::Lookup };
        if let Some(schema) = self.parameter_schema(&set.id, located, diagnostics) {
            set.contribute(Some(Verb::Read), SchemaSource::Parameters, role, schema);
        }
    }

    /// Resolve a locator to exactly one operation.
    fn locate(&self, id: &EntityId, locator: &OperationLocator) -> Result<Located<'a>, EntityError> {
        let not_found = |reason: &str| EntityError::ConfigResolution {
            entity: id.clone(),
            locator: locator.to_string(),
            reason: reason.to_string(),
        };

        if let Some(ref operation_id) = locator.operation_id {
            let mut matches = self.doc.operations_with_id(operation_id);
            return match matches.len() {
                0 => Err(not_found("no operation has this operationId")),
                1 => {
                    let (path, method, operation) = matches.remove(0);
                    Ok(Located { path, method, operation })
                }
                _ => Err(EntityError::AmbiguousReference {
                    entity: id.clone(),
                    locator: locator.to_string(),
                    candidates: matches
                        .iter()
                        .map(|(path, method, _)| format!("{method} {path}"))
                        .collect(),
                }),
            };
        }

        let path = locator
            .path
            .as_deref()
            .ok_or_else(|| not_found("locator has neither path nor operation_id"))?;
        let (path, item) = self
            .doc
            .spec()
            .paths
            .get_key_value(path)
            .ok_or_else(|| not_found("path does not exist in the document"))?;

        match locator.method {
            Some(method) => item
                .operation(method)
                .map(|operation| Located {
                    path: path.as_str(),
                    method,
                    operation,
                })
                .ok_or_else(|| not_found("path has no operation for this method")),
            None => {
                let mut ops: Vec<(HttpMethod, &Operation)> = item.operations().collect();
                match ops.len() {
                    0 => Err(not_found("path has no operations")),
                    1 => {
                        let (method, operation) = ops.remove(0);
                        Ok(Located {
                            path: path.as_str(),
                            method,
                            operation,
                        })
                    }
                    _ => Err(EntityError::AmbiguousReference {
                        entity: id.clone(),
                        locator: locator.to_string(),
                        candidates: ops
                            .iter()
                            .map(|(method, _)| format!("{method} {path}"))
                            .collect(),
                    }),
                }
            }
        }
    }

    fn request_schema(
        &self,
        id: &EntityId,
        located: &Located<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Option<&'a SchemaOrRef> {
        let body = located.operation.request_body.as_ref()?;
        let body = match self.doc.resolve_request_body(body) {
            Ok(body) => body,
            Err(err) => {
                diagnostics.warn(
                    WarningKind::UnsupportedSchema,
                    id,
                    "",
                    format!("request body of {located}: {err}"),
                );
                return None;
            }
        };
        preferred_media_type(&body.content).and_then(|(_, mt)| mt.schema.as_ref())
    }

    /// Body schema of the first success response that has one.
    fn response_schema(
        &self,
        id: &EntityId,
        located: &Located<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Option<&'a SchemaOrRef> {
        for (status, response) in &located.operation.responses {
            if !is_success_status(status) {
                continue;
            }
            let response = match self.doc.resolve_response(response) {
                Ok(response) => response,
                Err(err) => {
                    diagnostics.warn(
                        WarningKind::UnsupportedSchema,
                        id,
                        "",
                        format!("{status} response of {located}: {err}"),
                    );
                    continue;
                }
            };
            if let Some(schema) =
                preferred_media_type(&response.content).and_then(|(_, mt)| mt.schema.as_ref())
            {
                return Some(schema);
            }
        }
        None
    }

    /// Synthesise an object schema from path and query parameters.
    ///
    /// Operation-level parameters override path-level ones with the same name
    /// and location.
    fn parameter_schema(
        &self,
        id: &EntityId,
        located: &Located<'a>,
        diagnostics: &mut Diagnostics,
    ) -> Option<SchemaOrRef> {
        let path_level = self
            .doc
            .path_item(located.path)
            .map(|item| item.parameters.as_slice())
            .unwrap_or_default();

        let mut params: IndexMap<(&str, ParameterLocation), &Parameter> = IndexMap::new();
        for param in path_level.iter().chain(&located.operation.parameters) {
            match self.doc.resolve_parameter(param) {
                Ok(p) => {
                    params.insert((p.name.as_str(), p.location), p);
                }
                Err(err) => diagnostics.warn(
                    WarningKind::UnsupportedSchema,
                    id,
                    "",
                    format!("parameter of {located}: {err}"),
                ),
            }
        }

        let mut object = Schema {
            schema_type: Some(TypeSet::Single(SchemaType::Object)),
            ..Default::default()
        };
        for param in params.values() {
            if !matches!(param.location, ParameterLocation::Path | ParameterLocation::Query) {
                continue;
            }
            let Some(schema) = parameter_property(param) else {
                continue;
            };
            object.properties.insert(param.name.clone(), schema);
            if param.required {
                object.required.push(param.name.clone());
            }
        }

        if object.properties.is_empty() {
            None
        } else {
            Some(SchemaOrRef::inline(object))
        }
    }

    fn is_object_array(&self, schema: &SchemaOrRef) -> bool {
        let Ok(resolved) = self.doc.resolve_schema(schema) else {
            return false;
        };
        let Some(items) = resolved.schema.items.as_deref() else {
            return false;
        };
        let is_array = match resolved.schema.schema_type {
            Some(ref ts) => ts.non_null() == [SchemaType::Array],
            None => true,
        };
        is_array
            && self.doc.resolve_schema(items).is_ok_and(|item| {
                !item.schema.properties.is_empty()
                    || !item.schema.all_of.is_empty()
                    || item
                        .schema
                        .schema_type
                        .as_ref()
                        .is_some_and(|ts| ts.non_null() == [SchemaType::Object])
            })
    }
}

/// Parameter schema carrying the parameter's own description and deprecation.
fn parameter_property(param: &Parameter) -> Option<SchemaOrRef> {
    let schema = param.schema.as_ref()?;
    let needs_wrapper = param.description.is_some() || param.deprecated == Some(true);
    Some(match schema {
        SchemaOrRef::Schema(inline) => {
            let mut inline = inline.as_ref().clone();
            if inline.description.is_none() {
                inline.description = param.description.clone();
            }
            if param.deprecated == Some(true) {
                inline.deprecated = Some(true);
            }
            SchemaOrRef::inline(inline)
        }
        SchemaOrRef::Ref { .. } if needs_wrapper => SchemaOrRef::inline(Schema {
            description: param.description.clone(),
            deprecated: param.deprecated,
            all_of: vec![schema.clone()],
            ..Default::default()
        }),
        SchemaOrRef::Ref { .. } => schema.clone(),
    })
}

fn operation_description(operation: &Operation) -> Option<String> {
    operation
        .description
        .as_ref()
        .or(operation.summary.as_ref())
        .filter(|d| !d.trim().is_empty())
        .cloned()
}

/// An operation a locator resolved to.
#[derive(Debug, Clone, Copy)]
struct Located<'a> {
    path: &'a str,
    method: HttpMethod,
    operation: &'a Operation,
}

impl fmt::Display for Located<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const DOC: &str = r##"
openapi: 3.0.3
info: { title: Explore, version: "1" }
paths:
  /pets:
    parameters:
      - name: limit
        in: query
        schema: { type: integer }
    get:
      operationId: listPets
      summary: List pets
      parameters:
        - name: status
          in: query
          required: true
          description: Status filter
          schema: { type: string }
        - name: X-Trace
          in: header
          schema: { type: string }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema:
                type: array
                items: { $ref: '#/components/schemas/Pet' }
    post:
      operationId: createPet
      description: Create a pet
      requestBody:
        content:
          application/json:
            schema: { $ref: '#/components/schemas/NewPet' }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
  /pets/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema: { type: string }
    get:
      operationId: getPet
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: '#/components/schemas/Pet' }
    delete:
      operationId: dupe
      responses:
        "204": { description: gone }
    patch:
      operationId: dupe
      responses:
        "200": { description: no body }
components:
  schemas:
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string }
    Pet:
      allOf:
        - $ref: '#/components/schemas/NewPet'
        - type: object
          properties:
            id: { type: string }
"##;

    fn setup(config: &str) -> (DocumentModel, Config) {
        (
            DocumentModel::new(parse::from_yaml(DOC).unwrap()),
            Config::from_yaml(config).unwrap(),
        )
    }

    #[test]
    fn resource_collects_contributions_in_verb_order() {
        let (doc, config) = setup(
            r#"
provider: { name: p }
resources:
  pet:
    read: { path: '/pets/{id}', method: GET }
    create: { path: /pets, method: POST }
    delete: { path: '/pets/{id}', method: DELETE }
"#,
        );
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::Resource, &mut diags);
        let set = found.into_iter().next().unwrap().unwrap();

        assert_eq!(set.verbs, vec![Verb::Create, Verb::Read, Verb::Delete]);
        let described: Vec<String> = set.contributions.iter().map(|c| c.describe()).collect();
        assert_eq!(
            described,
            vec![
                "create request body",
                "create response body",
                "read response body",
                "read parameters",
            ]
        );
        assert_eq!(set.contributions[0].role, Role::Write);
        assert_eq!(set.contributions[2].role, Role::Read);
        assert_eq!(set.contributions[3].role, Role::Lookup);
        assert_eq!(set.description.as_deref(), Some("Create a pet"));
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_path_is_a_resolution_error() {
        let (doc, config) = setup(
            "provider: { name: p }\nresources:\n  ghost:\n    read: { path: /ghosts, method: GET }\n",
        );
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::Resource, &mut diags);
        match &found[0] {
            Err(EntityError::ConfigResolution { entity, locator, .. }) => {
                assert_eq!(entity.name, "ghost");
                assert_eq!(locator, "GET /ghosts");
            }
            other => panic!("expected ConfigResolution, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_operation_id_is_ambiguous() {
        let (doc, config) = setup(
            "provider: { name: p }\nresources:\n  pet:\n    delete: { operation_id: dupe }\n",
        );
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::Resource, &mut diags);
        match &found[0] {
            Err(EntityError::AmbiguousReference { candidates, .. }) => {
                assert_eq!(candidates, &["DELETE /pets/{id}", "PATCH /pets/{id}"]);
            }
            other => panic!("expected AmbiguousReference, got {other:?}"),
        }
    }

    #[test]
    fn path_without_method_must_be_unambiguous() {
        let (doc, config) =
            setup("provider: { name: p }\nresources:\n  pet:\n    read: { path: /pets }\n");
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::Resource, &mut diags);
        assert!(matches!(found[0], Err(EntityError::AmbiguousReference { .. })));
    }

    #[test]
    fn missing_body_schema_is_a_warning() {
        let (doc, config) = setup(
            "provider: { name: p }\nresources:\n  pet:\n    update: { operation_id: getPet }\n",
        );
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::Resource, &mut diags);
        let set = found[0].as_ref().unwrap();
        // The read path parameter is not consulted for update.
        assert!(set.contributions.is_empty());
        assert_eq!(diags.of_kind(WarningKind::MissingVerbSchema).count(), 1);
    }

    #[test]
    fn collection_data_source_wraps_array_and_uses_parameters_as_inputs() {
        let (doc, config) = setup(
            "provider: { name: p }\ndata_sources:\n  pets:\n    read: { operation_id: listPets }\n",
        );
        let mut diags = Diagnostics::new();
        let found = Explorer::new(&doc, &config).find(EntityKind::DataSource, &mut diags);
        let set = found[0].as_ref().unwrap();
        assert_eq!(set.contributions.len(), 2);

        let SchemaOrRef::Schema(wrapper) = &set.contributions[0].schema else {
            panic!("expected synthesized wrapper");
        };
        assert!(wrapper.properties.contains_key("pets"));

        let params = &set.contributions[1];
        assert_eq!(params.role, Role::Write);
        let SchemaOrRef::Schema(params) = &params.schema else {
            panic!("expected synthesized parameters");
        };
        let names: Vec<&String> = params.properties.keys().collect();
        assert_eq!(names, vec!["limit", "status"]);
        assert_eq!(params.required, vec!["status"]);
        let SchemaOrRef::Schema(status) = &params.properties["status"] else {
            panic!("inline parameter schema");
        };
        assert_eq!(status.description.as_deref(), Some("Status filter"));
    }
}
