use indexmap::IndexMap;

use super::operation::{HttpMethod, Operation, PathItem};
use super::response::Response;
use super::schema::{Schema, SchemaOrRef};
use super::spec::{Components, OpenApiSpec, Parameter, RefOr, RequestBody, SecurityScheme};
use crate::error::ResolveError;

/// Read-only view over a parsed OpenAPI document.
///
/// References are resolved lazily on lookup rather than inlined up front, so
/// self-referential component schemas stay finite in memory and every
/// referenced schema keeps a stable identity (its `$ref` pointer).
#[derive(Debug, Clone)]
pub struct DocumentModel {
    spec: OpenApiSpec,
}

/// A schema reached through zero or more `$ref` hops.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSchema<'a> {
    pub schema: &'a Schema,
    /// Pointer of the last reference followed, if any.
    pub identity: Option<&'a str>,
}

impl DocumentModel {
    pub fn new(spec: OpenApiSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    fn components(&self) -> Option<&Components> {
        self.spec.components.as_ref()
    }

    pub fn path_item(&self, path: &str) -> Option<&PathItem> {
        self.spec.paths.get(path)
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.path_item(path).and_then(|item| item.operation(method))
    }

    /// Every operation whose `operationId` equals `operation_id`, in document order.
    pub fn operations_with_id(&self, operation_id: &str) -> Vec<(&str, HttpMethod, &Operation)> {
        self.spec
            .paths
            .iter()
            .flat_map(|(path, item)| {
                item.operations()
                    .map(move |(method, op)| (path.as_str(), method, op))
            })
            .filter(|(_, _, op)| op.operation_id.as_deref() == Some(operation_id))
            .collect()
    }

    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.components()
            .and_then(|c| c.security_schemes.get(name))
    }

    /// Look up a named component parameter, following references.
    pub fn component_parameter(&self, name: &str) -> Result<&Parameter, ResolveError> {
        let param = self
            .components()
            .and_then(|c| c.parameters.get(name))
            .ok_or_else(|| {
                ResolveError::RefTargetNotFound(format!("#/components/parameters/{name}"))
            })?;
        self.resolve_parameter(param)
    }

    /// Follow `$ref` hops until an inline schema is reached.
    pub fn resolve_schema<'a>(
        &'a self,
        schema_or_ref: &'a SchemaOrRef,
    ) -> Result<ResolvedSchema<'a>, ResolveError> {
        let mut current = schema_or_ref;
        let mut identity = None;
        let mut hops: Vec<&str> = Vec::new();
        loop {
            match current {
                SchemaOrRef::Schema(schema) => {
                    return Ok(ResolvedSchema {
                        schema: schema.as_ref(),
                        identity,
                    });
                }
                SchemaOrRef::Ref { ref_path } => {
                    if hops.contains(&ref_path.as_str()) {
                        return Err(ResolveError::CircularRef(ref_path.clone()));
                    }
                    hops.push(ref_path);
                    identity = Some(ref_path.as_str());
                    current = self.lookup_schema(ref_path)?;
                }
            }
        }
    }

    pub fn resolve_parameter<'a>(
        &'a self,
        param: &'a RefOr<Parameter>,
    ) -> Result<&'a Parameter, ResolveError> {
        self.follow(param, "parameters", |c| &c.parameters)
    }

    pub fn resolve_request_body<'a>(
        &'a self,
        body: &'a RefOr<RequestBody>,
    ) -> Result<&'a RequestBody, ResolveError> {
        self.follow(body, "requestBodies", |c| &c.request_bodies)
    }

    pub fn resolve_response<'a>(
        &'a self,
        response: &'a RefOr<Response>,
    ) -> Result<&'a Response, ResolveError> {
        self.follow(response, "responses", |c| &c.responses)
    }

    /// Follow `$ref` hops within one components section.
    fn follow<'a, T>(
        &'a self,
        start: &'a RefOr<T>,
        section: &str,
        entries: impl Fn(&'a Components) -> &'a IndexMap<String, RefOr<T>>,
    ) -> Result<&'a T, ResolveError> {
        let mut current = start;
        let mut last_ref = None;
        for _ in 0..MAX_HOPS {
            match current {
                RefOr::Item(item) => return Ok(item),
                RefOr::Ref { ref_path } => {
                    let name = parse_ref_name(ref_path, section)?;
                    last_ref = Some(ref_path);
                    current = self
                        .components()
                        .map(&entries)
                        .and_then(|map| map.get(name))
                        .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.clone()))?;
                }
            }
        }
        Err(ResolveError::CircularRef(
            last_ref.cloned().unwrap_or_else(|| section.to_string()),
        ))
    }

    fn lookup_schema(&self, ref_path: &str) -> Result<&SchemaOrRef, ResolveError> {
        let name = parse_ref_name(ref_path, "schemas")?;
        self.components()
            .and_then(|c| c.schemas.get(name))
            .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.to_string()))
    }
}

const MAX_HOPS: usize = 32;

/// Parse a `$ref` path like `#/components/schemas/Foo` and extract the name.
fn parse_ref_name<'a>(ref_path: &'a str, expected_section: &str) -> Result<&'a str, ResolveError> {
    if !ref_path.starts_with('#') {
        return Err(ResolveError::UnresolvedRef(ref_path.to_string()));
    }
    let stripped = ref_path
        .strip_prefix("#/components/")
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    let (section, name) = stripped
        .split_once('/')
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    if section != expected_section {
        return Err(ResolveError::InvalidRefFormat(format!(
            "expected section '{}', got '{}' in {}",
            expected_section, section, ref_path
        )));
    }
    Ok(name)
}
