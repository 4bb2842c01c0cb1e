use crate::config::{EntityId, ProviderConfig};
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::EntityError;
use crate::parse::DocumentModel;
use crate::parse::schema::{Schema, SchemaOrRef, SchemaType, TypeSet};
use crate::parse::spec::{SecurityScheme, SecuritySchemeType};

use super::{EntitySchemaSet, Role, SchemaSource};

/// Provider attributes come from one component schema plus credentials.
pub(super) fn explore_provider(
    doc: &DocumentModel,
    config: &ProviderConfig,
    id: &EntityId,
    diagnostics: &mut Diagnostics,
) -> Result<EntitySchemaSet, EntityError> {
    let mut set = EntitySchemaSet::new(id.clone());

    if let Some(ref schema_ref) = config.schema_ref {
        let schema = SchemaOrRef::reference(schema_ref);
        if let Err(err) = doc.resolve_schema(&schema) {
            return Err(EntityError::ConfigResolution {
                entity: id.clone(),
                locator: schema_ref.clone(),
                reason: err.to_string(),
            });
        }
        set.contribute(None, SchemaSource::ProviderSchema, Role::Write, schema);
    }

    let mut credentials = object_schema();
    for name in &config.security_schemes {
        let scheme = doc
            .security_scheme(name)
            .ok_or_else(|| EntityError::ConfigResolution {
                entity: id.clone(),
                locator: format!("#/components/securitySchemes/{name}"),
                reason: "security scheme does not exist in the document".to_string(),
            })?;
        add_scheme(&mut credentials, id, name, scheme, diagnostics)?;
    }

    for name in &config.header_parameters {
        let param = doc
            .component_parameter(name)
            .map_err(|err| EntityError::ConfigResolution {
                entity: id.clone(),
                locator: format!("#/components/parameters/{name}"),
                reason: err.to_string(),
            })?;
        let mut property = string_schema(param.description.clone());
        if let Some(SchemaOrRef::Schema(inline)) = &param.schema {
            property.format = inline.format.clone();
            property.enum_values = inline.enum_values.clone();
            property.default_value = inline.default_value.clone();
        }
        property.deprecated = param.deprecated;
        insert_credential(&mut credentials, id, &param.name, property)?;
    }

    if !credentials.properties.is_empty() {
        set.contribute(
            None,
            SchemaSource::Credentials,
            Role::Write,
            SchemaOrRef::inline(credentials),
        );
    }
    Ok(set)
}

fn add_scheme(
    credentials: &mut Schema,
    id: &EntityId,
    name: &str,
    scheme: &SecurityScheme,
    diagnostics: &mut Diagnostics,
) -> Result<(), EntityError> {
    let description = scheme.description.clone();
    match scheme.scheme_type {
        SecuritySchemeType::ApiKey => {
            insert_credential(credentials, id, name, secret_schema(description))?;
        }
        SecuritySchemeType::Http
            if scheme
                .scheme
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("basic")) =>
        {
            insert_credential(credentials, id, "username", string_schema(description.clone()))?;
            insert_credential(credentials, id, "password", secret_schema(description))?;
        }
        SecuritySchemeType::Http => {
            insert_credential(credentials, id, name, secret_schema(description))?;
        }
        SecuritySchemeType::OAuth2
        | SecuritySchemeType::OpenIdConnect
        | SecuritySchemeType::MutualTls => diagnostics.warn(
            WarningKind::UnsupportedSchema,
            id,
            name,
            "only apiKey and http security schemes map to provider attributes",
        ),
    }
    Ok(())
}

/// Add one credential property; two sources claiming the same name conflict.
fn insert_credential(
    credentials: &mut Schema,
    id: &EntityId,
    name: &str,
    property: Schema,
) -> Result<(), EntityError> {
    if credentials.properties.contains_key(name) {
        return Err(EntityError::OverrideConflict {
            entity: id.clone(),
            field_path: name.to_string(),
            reason: "declared by more than one security scheme or header parameter".to_string(),
        });
    }
    credentials
        .properties
        .insert(name.to_string(), SchemaOrRef::inline(property));
    Ok(())
}

fn object_schema() -> Schema {
    Schema {
        schema_type: Some(TypeSet::Single(SchemaType::Object)),
        ..Default::default()
    }
}

fn string_schema(description: Option<String>) -> Schema {
    Schema {
        schema_type: Some(TypeSet::Single(SchemaType::String)),
        description,
        ..Default::default()
    }
}

fn secret_schema(description: Option<String>) -> Schema {
    Schema {
        format: Some("password".to_string()),
        ..string_schema(description)
    }
}
