use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::media_type::MediaType;
use super::operation::PathItem;
use super::response::Response;
use super::schema::SchemaOrRef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub version: String,
}

/// Root of an OpenAPI 3.x document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    pub openapi: String,

    pub info: Info,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// Either a `$ref` pointer or an inline object.
///
/// Schemas have their own [`SchemaOrRef`] because they box the inline case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Item(T),
}

/// Named definitions under `#/components`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, RefOr<Response>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, RefOr<Parameter>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParameterLocation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub content: IndexMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

/// How a security scheme authenticates. Only `apiKey` and `http` map to
/// provider credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecuritySchemeType {
    ApiKey,
    Http,
    #[serde(rename = "oauth2")]
    OAuth2,
    OpenIdConnect,
    #[serde(rename = "mutualTLS")]
    MutualTls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: SecuritySchemeType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Header, query or cookie name for `apiKey` schemes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `basic`, `bearer`, ... for `http` schemes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_or_prefers_reference() {
        let r: RefOr<Parameter> =
            serde_json::from_str(r##"{"$ref": "#/components/parameters/Id"}"##).unwrap();
        assert_eq!(
            r,
            RefOr::Ref {
                ref_path: "#/components/parameters/Id".into()
            }
        );

        let p: RefOr<Parameter> =
            serde_json::from_str(r#"{"name": "id", "in": "path", "required": true}"#).unwrap();
        match p {
            RefOr::Item(param) => {
                assert_eq!(param.location, ParameterLocation::Path);
                assert!(param.required);
            }
            other => panic!("expected inline parameter, got {other:?}"),
        }
    }

    #[test]
    fn security_scheme_kinds() {
        let yaml = r#"
key: { type: apiKey, name: X-Api-Key, in: header }
basic: { type: http, scheme: basic }
oauth: { type: oauth2 }
tls: { type: mutualTLS }
"#;
        let schemes: IndexMap<String, SecurityScheme> = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(schemes["key"].scheme_type, SecuritySchemeType::ApiKey);
        assert_eq!(schemes["key"].name.as_deref(), Some("X-Api-Key"));
        assert_eq!(schemes["basic"].scheme.as_deref(), Some("basic"));
        assert_eq!(schemes["oauth"].scheme_type, SecuritySchemeType::OAuth2);
        assert_eq!(schemes["tls"].scheme_type, SecuritySchemeType::MutualTls);
    }
}
